//! Intermediate stages: filter, map, observe.
//!
//! Each stage is optional. When present they always run in the order
//! filter → map → observe, whatever order the builder methods were called in.

use std::fmt;
use std::future;

use futures::{Stream, StreamExt};

type Predicate<'a, T> = Box<dyn FnMut(&T) -> bool + 'a>;
type Mapper<'a, T> = Box<dyn FnMut(T) -> T + 'a>;
type Observer<'a, T> = Box<dyn FnMut(&T) + 'a>;

/// An ordered set of optional per-value stages.
pub struct Stages<'a, T> {
    filter: Option<Predicate<'a, T>>,
    map: Option<Mapper<'a, T>>,
    observe: Option<Observer<'a, T>>,
}

impl<T> Default for Stages<'_, T> {
    fn default() -> Self {
        Self {
            filter: None,
            map: None,
            observe: None,
        }
    }
}

impl<T> fmt::Debug for Stages<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stages")
            .field("filter", &self.filter.is_some())
            .field("map", &self.map.is_some())
            .field("observe", &self.observe.is_some())
            .finish()
    }
}

impl<'a, T> Stages<'a, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only values the predicate accepts. Replaces any earlier filter.
    #[must_use]
    pub fn filter(mut self, predicate: impl FnMut(&T) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Transform each surviving value. Replaces any earlier map.
    #[must_use]
    pub fn map(mut self, mapper: impl FnMut(T) -> T + 'a) -> Self {
        self.map = Some(Box::new(mapper));
        self
    }

    /// Run a side effect on each value after filtering and mapping.
    #[must_use]
    pub fn observe(mut self, observer: impl FnMut(&T) + 'a) -> Self {
        self.observe = Some(Box::new(observer));
        self
    }

    /// True when no stage is configured, i.e. `apply` is the identity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.map.is_none() && self.observe.is_none()
    }

    /// Push one value through the stages.
    pub fn step(&mut self, value: T) -> Option<T> {
        if let Some(filter) = self.filter.as_mut()
            && !filter(&value)
        {
            return None;
        }
        let value = match self.map.as_mut() {
            Some(map) => map(value),
            None => value,
        };
        if let Some(observe) = self.observe.as_mut() {
            observe(&value);
        }
        Some(value)
    }

    /// Attach the stages to a stream. Lazy: nothing runs until polled.
    pub fn apply<S>(self, source: S) -> impl Stream<Item = T> + 'a
    where
        S: Stream<Item = T> + 'a,
        T: 'a,
    {
        let mut stages = self;
        source.filter_map(move |value| future::ready(stages.step(value)))
    }
}

impl Stages<'static, u64> {
    /// Keep even values, double them, log each result.
    ///
    /// Works on `u64` so that every `u32` countdown value doubles exactly;
    /// widen the source with `u64::from` before applying.
    #[must_use]
    pub fn even_doubled_logged() -> Self {
        Self::new()
            .filter(|value| value % 2 == 0)
            .map(|value| value * 2)
            .observe(|value| tracing::debug!(message = "stage.observe", value = *value))
    }
}
