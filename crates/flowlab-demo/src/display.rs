//! Text rendering of the counter and countdown screen.
//!
//! The screen holds the latest countdown value and the latest counter value.
//! Both start at a placeholder until the first real value arrives. Every
//! press increments the session counter exactly once.

use std::io;
use std::pin::pin;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{FutureExt, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;
use crate::session::Session;
use crate::transcript::{EventKind, Transcript};

/// A value that reads as `placeholder` until the first `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestValue<T> {
    placeholder: T,
    value: Option<T>,
}

impl<T: Copy> LatestValue<T> {
    #[must_use]
    pub const fn new(placeholder: T) -> Self {
        Self {
            placeholder,
            value: None,
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.value.unwrap_or(self.placeholder)
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.value.is_none()
    }
}

/// What the screen currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenView {
    time: LatestValue<u64>,
    count: LatestValue<u64>,
}

impl ScreenView {
    #[must_use]
    pub const fn new(placeholder: u64) -> Self {
        Self {
            time: LatestValue::new(placeholder),
            count: LatestValue::new(placeholder),
        }
    }

    pub fn set_time(&mut self, time: u32) {
        self.time.set(u64::from(time));
    }

    pub fn set_count(&mut self, count: u64) {
        self.count.set(count);
    }

    #[must_use]
    pub fn time(&self) -> u64 {
        self.time.get()
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.get()
    }

    /// The pressable control's label.
    #[must_use]
    pub fn button(&self) -> String {
        format!("[ stateflowCount  {} ]", self.count())
    }

    #[must_use]
    pub fn render(&self) -> String {
        format!("time {}  {}", self.time(), self.button())
    }
}

/// `n` presses, each `spacing` after the previous one (the first after one
/// `spacing` as well).
#[must_use]
pub fn scripted_presses(n: u32, spacing: Duration) -> BoxStream<'static, io::Result<()>> {
    stream::iter(0..n)
        .then(move |_| async move {
            tokio::time::sleep(spacing).await;
            Ok(())
        })
        .boxed()
}

/// One press per line read from `reader`. Ends at EOF or after the first
/// read error, which is yielded.
pub fn line_presses<R>(reader: R) -> impl Stream<Item = io::Result<()>>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold(Some(reader.lines()), |state| async move {
        let mut lines = state?;
        match lines.next_line().await {
            Ok(Some(_)) => Some((Ok(()), Some(lines))),
            Ok(None) => None,
            Err(error) => Some((Err(error), None)),
        }
    })
}

fn show(view: &ScreenView, last: &mut Option<String>, transcript: &Transcript) {
    let line = view.render();
    if last.as_deref() != Some(line.as_str()) {
        transcript.record(EventKind::Render, line.clone());
        *last = Some(line);
    }
}

/// Drive the screen until the countdown has finished and `presses` is
/// exhausted. Returns the final view.
pub async fn run_screen<P>(
    session: &Session,
    placeholder: u64,
    presses: P,
    transcript: &Transcript,
) -> Result<ScreenView>
where
    P: Stream<Item = io::Result<()>>,
{
    let mut view = ScreenView::new(placeholder);
    let mut last = None;
    let mut countdown = session.countdown_flow();
    let mut counter = session.observe_counter();
    let mut presses = pin!(presses);
    let mut countdown_done = false;
    let mut input_done = false;

    show(&view, &mut last, transcript);
    loop {
        if countdown_done && input_done {
            if let Some(Some(count)) = counter.next().now_or_never() {
                view.set_count(count);
                show(&view, &mut last, transcript);
            }
            break;
        }
        tokio::select! {
            biased;
            Some(count) = counter.next() => {
                view.set_count(count);
                show(&view, &mut last, transcript);
            }
            next = countdown.next(), if !countdown_done => match next {
                Some(time) => {
                    view.set_time(time);
                    show(&view, &mut last, transcript);
                }
                None => countdown_done = true,
            },
            press = presses.next(), if !input_done => match press {
                Some(result) => {
                    result?;
                    session.increment_counter();
                    transcript.record(
                        EventKind::Press,
                        format!("press -> {}", session.counter_value()),
                    );
                }
                None => input_done = true,
            },
            else => break,
        }
    }
    tracing::debug!(
        time = view.time(),
        count = view.count(),
        "screen.finished"
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::OutputFormat;

    #[test]
    fn latest_value_shows_placeholder_first() {
        let mut value = LatestValue::new(10u64);
        assert!(value.is_placeholder());
        assert_eq!(value.get(), 10);
        value.set(0);
        assert!(!value.is_placeholder());
        assert_eq!(value.get(), 0);
    }

    #[test]
    fn render_layout() {
        let mut view = ScreenView::new(10);
        assert_eq!(view.render(), "time 10  [ stateflowCount  10 ]");
        view.set_time(4);
        view.set_count(2);
        assert_eq!(view.button(), "[ stateflowCount  2 ]");
        assert_eq!(view.render(), "time 4  [ stateflowCount  2 ]");
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_presses_increment_once_each() {
        let session = Session::default();
        let transcript = Transcript::new(OutputFormat::Text);
        let view = run_screen(
            &session,
            10,
            scripted_presses(3, Duration::from_millis(700)),
            &transcript,
        )
        .await
        .expect("screen run");

        assert_eq!(view.time(), 0);
        assert_eq!(view.count(), 3);
        assert_eq!(session.counter_value(), 3);

        let events = transcript.events();
        assert_eq!(events[0].message, "time 10  [ stateflowCount  10 ]");
        let presses: Vec<u64> = events
            .iter()
            .filter(|e| e.kind == EventKind::Press)
            .map(|e| e.at_ms)
            .collect();
        assert_eq!(presses, vec![700, 1400, 2100]);
        let last = events.last().expect("final render");
        assert_eq!(last.message, "time 0  [ stateflowCount  3 ]");
        assert_eq!(last.at_ms, 5000);
    }

    #[tokio::test(start_paused = true)]
    async fn no_presses_keeps_counter_at_zero() {
        let session = Session::default();
        let transcript = Transcript::new(OutputFormat::Text);
        let view = run_screen(&session, 10, stream::empty(), &transcript)
            .await
            .expect("screen run");
        assert_eq!(view.count(), 0);
        assert_eq!(view.time(), 0);
    }

    #[tokio::test]
    async fn each_input_line_is_one_press() {
        let input: &[u8] = b"\n\nx\n";
        let presses: Vec<io::Result<()>> = line_presses(input).collect().await;
        assert_eq!(presses.len(), 3);
        assert!(presses.iter().all(io::Result::is_ok));
    }
}
