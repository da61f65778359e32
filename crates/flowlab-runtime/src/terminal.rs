//! Terminal operators: drive a stream to completion and return one value.

use std::pin::pin;

use futures::{Stream, StreamExt};

use crate::error::PipelineError;

/// Left fold without a seed; the first element becomes the accumulator.
///
/// Fails with [`PipelineError::EmptySequence`] when the stream completes
/// without producing anything.
pub async fn reduce<S, T, F>(source: S, mut op: F) -> Result<T, PipelineError>
where
    S: Stream<Item = T>,
    F: FnMut(T, T) -> T,
{
    let mut source = pin!(source);
    let Some(mut acc) = source.next().await else {
        return Err(PipelineError::EmptySequence);
    };
    while let Some(value) = source.next().await {
        acc = op(acc, value);
    }
    Ok(acc)
}

/// Left fold from an explicit seed. Never fails.
pub async fn fold<S, T, A, F>(source: S, seed: A, mut op: F) -> A
where
    S: Stream<Item = T>,
    F: FnMut(A, T) -> A,
{
    let mut source = pin!(source);
    let mut acc = seed;
    while let Some(value) = source.next().await {
        acc = op(acc, value);
    }
    acc
}

/// Count the elements matching `predicate`.
pub async fn count<S, T, P>(source: S, mut predicate: P) -> usize
where
    S: Stream<Item = T>,
    P: FnMut(&T) -> bool,
{
    fold(source, 0usize, |n, value| if predicate(&value) { n + 1 } else { n }).await
}

/// Hand every element to `handler` in order; returns how many were seen.
pub async fn collect_each<S, T, F>(source: S, mut handler: F) -> usize
where
    S: Stream<Item = T>,
    F: FnMut(T),
{
    fold(source, 0usize, |n, value| {
        handler(value);
        n + 1
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::countdown;
    use crate::stages::Stages;
    use futures::stream;

    #[tokio::test(start_paused = true)]
    async fn reduce_sums_countdown() {
        assert_eq!(reduce(countdown(5), |acc, v| acc + v).await, Ok(15));
    }

    #[tokio::test(start_paused = true)]
    async fn fold_adds_seed() {
        assert_eq!(fold(countdown(5), 10, |acc, v| acc + v).await, 25);
        assert_eq!(fold(countdown(5), 0, |acc, v| acc + v).await, 15);
    }

    #[tokio::test]
    async fn reduce_on_empty_fails() {
        let empty = stream::empty::<u32>();
        assert_eq!(
            reduce(empty, |acc, v| acc + v).await,
            Err(PipelineError::EmptySequence)
        );
    }

    #[tokio::test]
    async fn fold_on_empty_returns_seed() {
        assert_eq!(fold(stream::empty::<u32>(), 7, |acc, v| acc + v).await, 7);
    }

    #[tokio::test]
    async fn reduce_is_left_to_right() {
        let digits = stream::iter(["1", "2", "3"].map(String::from));
        let joined = reduce(digits, |acc, v| format!("({acc}{v})")).await;
        assert_eq!(joined.as_deref(), Ok("((12)3)"));
    }

    #[tokio::test(start_paused = true)]
    async fn count_after_stages() {
        let staged = Stages::even_doubled_logged().apply(countdown(5).map(u64::from));
        assert_eq!(count(staged, |v| v % 2 == 0).await, 3);
    }

    #[tokio::test]
    async fn collect_each_preserves_order() {
        let mut seen = Vec::new();
        let n = collect_each(stream::iter([3, 2, 1]), |v| seen.push(v)).await;
        assert_eq!(n, 3);
        assert_eq!(seen, vec![3, 2, 1]);
    }
}
