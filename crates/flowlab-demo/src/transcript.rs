//! Ordered record of what a strategy run printed, with elapsed time.
//!
//! Every event is kept in memory and, when a sink is attached, written out
//! immediately as text or as one JSON object per line.

use std::cell::RefCell;
use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::Result;

/// How transcript lines are written to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Delivered,
    Started,
    Finished,
    Value,
    Result,
    Render,
    Press,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub at_ms: u64,
    pub kind: EventKind,
    pub message: String,
}

impl Event {
    pub fn to_line(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Text => format!("[{:>5} ms] {}", self.at_ms, self.message),
            OutputFormat::Json => serde_json::to_string(self)?,
        })
    }
}

pub struct Transcript {
    origin: Instant,
    format: OutputFormat,
    events: RefCell<Vec<Event>>,
    sink: RefCell<Option<Box<dyn Write>>>,
    failure: RefCell<Option<io::Error>>,
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("format", &self.format)
            .field("events", &self.events.borrow().len())
            .field("echo", &self.sink.borrow().is_some())
            .finish()
    }
}

impl Transcript {
    /// Start recording now; nothing is echoed.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            origin: Instant::now(),
            format,
            events: RefCell::new(Vec::new()),
            sink: RefCell::new(None),
            failure: RefCell::new(None),
        }
    }

    /// Echo every recorded event to `sink` as it happens.
    #[must_use]
    pub fn echo_to(self, sink: impl Write + 'static) -> Self {
        *self.sink.borrow_mut() = Some(Box::new(sink));
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn record(&self, kind: EventKind, message: impl Into<String>) {
        let event = Event {
            at_ms: self.elapsed_ms(),
            kind,
            message: message.into(),
        };
        tracing::trace!(at_ms = event.at_ms, kind = ?event.kind, "transcript.record");
        self.echo(&event);
        self.events.borrow_mut().push(event);
    }

    fn echo(&self, event: &Event) {
        if self.failure.borrow().is_some() {
            return;
        }
        let mut sink = self.sink.borrow_mut();
        let Some(out) = sink.as_mut() else {
            return;
        };
        let written = match event.to_line(self.format) {
            Ok(line) => writeln!(out, "{line}").and_then(|()| out.flush()),
            Err(error) => Err(io::Error::other(error)),
        };
        if let Err(error) = written {
            *self.failure.borrow_mut() = Some(error);
        }
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Messages only, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.message.clone())
            .collect()
    }

    /// Stop recording. Surfaces the first write failure, if any.
    pub fn finish(self) -> Result<Vec<Event>> {
        if let Some(error) = self.failure.into_inner() {
            return Err(error.into());
        }
        Ok(self.events.into_inner())
    }
}
