use std::time::Duration;

use flowlab_runtime::source::CountdownSource;

use crate::error::{DemoError, Result};
use crate::transcript::OutputFormat;

pub const DEFAULT_PLACEHOLDER: u64 = 10;
pub const DEFAULT_REPLAY: usize = flowlab_runtime::reactive::broadcast::DEFAULT_REPLAY;
pub const DEFAULT_HANDLER_MS: u64 = 1500;

/// Settings shared by every strategy, resolved from flags and `FLOWLAB_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub start: u32,
    pub tick: Duration,
    pub placeholder: u64,
    pub replay: usize,
    pub handler: Duration,
    pub presses: Option<u32>,
    pub output: OutputFormat,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            start: CountdownSource::DEFAULT_START,
            tick: CountdownSource::DEFAULT_PERIOD,
            placeholder: DEFAULT_PLACEHOLDER,
            replay: DEFAULT_REPLAY,
            handler: Duration::from_millis(DEFAULT_HANDLER_MS),
            presses: None,
            output: OutputFormat::Text,
        }
    }
}

impl DemoConfig {
    pub fn validate(self) -> Result<Self> {
        if self.replay == 0 {
            return Err(DemoError::invalid("--replay must be at least 1"));
        }
        if self.tick.is_zero() {
            return Err(DemoError::invalid("--tick-ms must be at least 1"));
        }
        Ok(self)
    }

    #[must_use]
    pub fn countdown(&self) -> CountdownSource {
        CountdownSource::new(self.start).with_period(self.tick)
    }
}
