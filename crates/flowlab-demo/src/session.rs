//! The view-model: owns the countdown source, the counter, and the shared log.

use futures::stream::BoxStream;

use flowlab_runtime::reactive::{BroadcastLog, Counter, StateStream};
use flowlab_runtime::source::{ColdSource, CountdownSource};

use crate::config::DemoConfig;

/// Values published by [`Session::burst_shared`].
pub const BURST: std::ops::RangeInclusive<u32> = 0..=10;

#[derive(Debug)]
pub struct Session {
    countdown: CountdownSource,
    counter: Counter,
    shared: BroadcastLog<u32>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&DemoConfig::default())
    }
}

impl Session {
    #[must_use]
    pub fn new(config: &DemoConfig) -> Self {
        tracing::info!(
            start = config.start,
            tick_ms = config.tick.as_millis() as u64,
            replay = config.replay,
            "session.created"
        );
        Self {
            countdown: config.countdown(),
            counter: Counter::new(),
            shared: BroadcastLog::new(config.replay),
        }
    }

    /// Fresh countdown subscription.
    #[must_use]
    pub fn countdown_flow(&self) -> BoxStream<'static, u32> {
        self.countdown.subscribe()
    }

    pub fn increment_counter(&self) {
        self.counter.increment();
        tracing::info!(value = self.counter.current_value(), "session.increment");
    }

    #[must_use]
    pub fn counter_value(&self) -> u64 {
        self.counter.current_value()
    }

    #[must_use]
    pub fn observe_counter(&self) -> StateStream<u64> {
        self.counter.observe()
    }

    #[must_use]
    pub fn shared_log(&self) -> &BroadcastLog<u32> {
        &self.shared
    }

    /// Publish 0..=10 into the shared log, then bump the counter once.
    pub fn burst_shared(&self) {
        for value in BURST {
            self.shared.emit(value);
        }
        self.counter.increment();
        tracing::info!(
            emitted = self.shared.emitted(),
            counter = self.counter.current_value(),
            "session.burst_shared"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn increment_counts_presses() {
        let session = Session::default();
        assert_eq!(session.counter_value(), 0);
        session.increment_counter();
        session.increment_counter();
        assert_eq!(session.counter_value(), 2);
    }

    #[test]
    fn burst_leaves_last_five_and_one_increment() {
        let session = Session::default();
        session.burst_shared();
        assert_eq!(session.shared_log().replay(), vec![6, 7, 8, 9, 10]);
        assert_eq!(session.counter_value(), 1);
    }

    #[test]
    fn burst_honours_configured_replay() {
        let config = DemoConfig {
            replay: 3,
            ..DemoConfig::default()
        };
        let session = Session::new(&config);
        session.burst_shared();
        assert_eq!(session.shared_log().replay(), vec![8, 9, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn each_countdown_subscription_is_fresh() {
        let session = Session::default();
        let first: Vec<u32> = session.countdown_flow().collect().await;
        let second: Vec<u32> = session.countdown_flow().collect().await;
        assert_eq!(first, vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(first, second);
    }
}
