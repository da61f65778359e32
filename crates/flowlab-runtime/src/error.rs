use thiserror::Error;

/// Errors surfaced by terminal pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A seedless reduction ran over a sequence that produced no elements.
    #[error("empty sequence: reduce needs at least one element")]
    EmptySequence,
}
