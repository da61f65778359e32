//! Alternative ways of collecting the countdown and the course stream.
//!
//! Each runner records what it prints into a [`Transcript`] and returns the
//! value it computed so callers and tests can check it directly.

use std::time::Duration;

use futures::StreamExt;

use flowlab_core::cx::Cx;
use flowlab_runtime::policy::{ConsumeReport, ConsumerPolicy, consume};
use flowlab_runtime::source::{ColdSource, Course, TimedCourse};
use flowlab_runtime::stages::Stages;
use flowlab_runtime::terminal::{collect_each, count, fold, reduce};

use crate::error::Result;
use crate::session::Session;
use crate::transcript::{EventKind, Transcript};

/// Seed used by the `fold` strategy unless overridden.
pub const DEFAULT_FOLD_SEED: u64 = 10;

/// Even values, doubled, each printed as `Time is N`. Returns how many.
pub async fn collect(session: &Session, transcript: &Transcript) -> usize {
    let staged = Stages::even_doubled_logged().apply(session.countdown_flow().map(u64::from));
    collect_each(staged, |time| {
        transcript.record(EventKind::Value, format!("Time is {time}"));
    })
    .await
}

/// Count the staged values that are even.
pub async fn count_even(session: &Session, transcript: &Transcript) -> usize {
    let staged = Stages::even_doubled_logged().apply(session.countdown_flow().map(u64::from));
    let n = count(staged, |time| time % 2 == 0).await;
    transcript.record(EventKind::Result, format!("The count is {n}"));
    n
}

/// Sum the countdown without a seed.
pub async fn sum_reduce(session: &Session, transcript: &Transcript) -> Result<u64> {
    let total = reduce(session.countdown_flow().map(u64::from), |acc, v| acc + v).await?;
    transcript.record(EventKind::Result, format!("The count is {total}"));
    Ok(total)
}

/// Sum the countdown starting from `seed`.
pub async fn sum_fold(session: &Session, seed: u64, transcript: &Transcript) -> u64 {
    let total = fold(session.countdown_flow(), seed, |acc, v| acc + u64::from(v)).await;
    transcript.record(EventKind::Result, format!("The count is {total}"));
    total
}

/// Eat one course. A cancelled meal records nothing past `Now eating`.
async fn eat(course: Course, cx: Cx, eating: Duration, transcript: &Transcript) {
    transcript.record(EventKind::Started, format!("FLOW: Now eating {course}"));
    if cx.sleep(eating).await {
        transcript.record(EventKind::Finished, format!("FLOW: Finished eating {course}"));
    }
}

/// Serve the timed course under `policy`, eating each delivered course for
/// `eating`.
pub async fn courses(
    policy: ConsumerPolicy,
    eating: Duration,
    transcript: &Transcript,
) -> ConsumeReport<Course> {
    let delivered = Stages::new()
        .observe(|course: &Course| {
            transcript.record(EventKind::Delivered, format!("FLOW: {course} is delivered"));
        })
        .apply(TimedCourse.subscribe());

    let report = consume(delivered, policy, |course, cx| {
        eat(course, cx, eating, transcript)
    })
    .await;

    for course in &report.dropped {
        tracing::debug!(course = course.label(), "courses.conflated");
    }
    transcript.record(
        EventKind::Result,
        format!(
            "FLOW: {policy}: {} started, {} finished, {} cancelled, {} skipped",
            report.started.len(),
            report.completed.len(),
            report.cancelled.len(),
            report.dropped.len()
        ),
    );
    report
}

/// Burst 0..=10 into the shared log, then read it as a late subscriber.
/// Returns the replayed values.
pub async fn shared(session: &Session, transcript: &Transcript) -> Vec<u32> {
    session.burst_shared();
    let log = session.shared_log();
    let replayed: Vec<u32> = log.stream().take(log.replay().len()).collect().await;
    for value in &replayed {
        transcript.record(EventKind::Value, format!("SHARED: {value}"));
    }
    transcript.record(
        EventKind::Result,
        format!("stateflowCount is {}", session.counter_value()),
    );
    replayed
}
