//! Cold sources.
//!
//! A cold source produces nothing until subscribed, and every subscription
//! starts from the beginning with fresh state. Nothing is shared between
//! subscribers.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};

/// A restartable producer of timed values.
pub trait ColdSource {
    type Item;

    /// Start a fresh, independent emission sequence.
    fn subscribe(&self) -> BoxStream<'static, Self::Item>;
}

// ─── Countdown ───────────────────────────────────────────────────────────────

/// Strictly decreasing integers from `start` down to `0` inclusive.
///
/// The first value is emitted immediately; every following value waits one
/// `period`. Unsigned start values make negative emissions unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownSource {
    start: u32,
    period: Duration,
}

impl CountdownSource {
    pub const DEFAULT_START: u32 = 5;
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    #[must_use]
    pub const fn new(start: u32) -> Self {
        Self {
            start,
            period: Self::DEFAULT_PERIOD,
        }
    }

    /// Override the pause between emissions.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Number of values one subscription emits.
    #[must_use]
    pub const fn emission_count(&self) -> u64 {
        self.start as u64 + 1
    }
}

impl Default for CountdownSource {
    fn default() -> Self {
        Self::new(Self::DEFAULT_START)
    }
}

impl ColdSource for CountdownSource {
    type Item = u32;

    fn subscribe(&self) -> BoxStream<'static, u32> {
        let period = self.period;
        // State: (next value, whether a pause precedes it). None once 0 is out.
        stream::unfold(Some((self.start, false)), move |state| async move {
            let (value, pause) = state?;
            if pause {
                tokio::time::sleep(period).await;
            }
            tracing::trace!(value, "countdown.emit");
            let next = value.checked_sub(1).map(|n| (n, true));
            Some((value, next))
        })
        .boxed()
    }
}

/// Subscribe to a countdown from `start` with the default one-second period.
#[must_use]
pub fn countdown(start: u32) -> BoxStream<'static, u32> {
    CountdownSource::new(start).subscribe()
}

// ─── Timed course ────────────────────────────────────────────────────────────

/// One item of the three-course sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Course {
    Appetizer,
    MainDish,
    Dessert,
}

impl Course {
    /// Serving order.
    pub const ALL: [Course; 3] = [Course::Appetizer, Course::MainDish, Course::Dessert];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Appetizer => "Appetizer",
            Self::MainDish => "Main dish",
            Self::Dessert => "Dessert",
        }
    }

    /// Delay before this course is emitted, measured from the previous one.
    #[must_use]
    pub const fn lead_time(self) -> Duration {
        match self {
            Self::Appetizer => Duration::from_millis(250),
            Self::MainDish => Duration::from_millis(1000),
            Self::Dessert => Duration::from_millis(100),
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed three-item sequence with unequal spacing, used to exercise the
/// consumer policies against a handler slower than the producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimedCourse;

impl ColdSource for TimedCourse {
    type Item = Course;

    fn subscribe(&self) -> BoxStream<'static, Course> {
        stream::iter(Course::ALL)
            .then(|course| async move {
                tokio::time::sleep(course.lead_time()).await;
                tracing::trace!(course = course.label(), "course.emit");
                course
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn countdown_emits_start_to_zero() {
        let values: Vec<u32> = countdown(5).collect().await;
        assert_eq!(values, vec![5, 4, 3, 2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_zero_emits_single_value() {
        let values: Vec<u32> = countdown(0).collect().await;
        assert_eq!(values, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_first_value_is_immediate_then_one_period_apart() {
        let started = Instant::now();
        let mut stream = countdown(2);
        let mut stamps = Vec::new();
        while let Some(value) = stream.next().await {
            stamps.push((value, started.elapsed()));
        }
        assert_eq!(
            stamps,
            vec![
                (2, Duration::ZERO),
                (1, Duration::from_secs(1)),
                (0, Duration::from_secs(2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_is_cold_per_subscription() {
        let source = CountdownSource::new(3).with_period(Duration::from_millis(10));
        let mut first = source.subscribe();
        assert_eq!(first.next().await, Some(3));
        assert_eq!(first.next().await, Some(2));

        // A second subscriber starts over regardless of the first one's progress.
        let second: Vec<u32> = source.subscribe().collect().await;
        assert_eq!(second, vec![3, 2, 1, 0]);

        let rest: Vec<u32> = first.collect().await;
        assert_eq!(rest, vec![1, 0]);
    }

    #[test]
    fn countdown_defaults() {
        let source = CountdownSource::default();
        assert_eq!(source.start(), 5);
        assert_eq!(source.period(), Duration::from_secs(1));
        assert_eq!(source.emission_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_course_spacing() {
        let started = Instant::now();
        let mut stream = TimedCourse.subscribe();
        let mut stamps = Vec::new();
        while let Some(course) = stream.next().await {
            stamps.push((course, started.elapsed().as_millis()));
        }
        assert_eq!(
            stamps,
            vec![
                (Course::Appetizer, 250),
                (Course::MainDish, 1250),
                (Course::Dessert, 1350),
            ]
        );
    }

    #[test]
    fn course_labels() {
        let labels: Vec<String> = Course::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["Appetizer", "Main dish", "Dessert"]);
    }
}
