//! Virtual-time test harness.
//!
//! A [`TestScheduler`] wraps a virtual [`Scheduler`] and adds what a
//! timeline-driven test needs: hot observables scripted with the
//! [notation](notation), recorders, and mocked async capabilities whose
//! answers arrive at scripted ticks.
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::time::Duration;
//! use formwire_harness::*;
//!
//! let scheduler = TestScheduler::new(Duration::from_millis(200));
//! let bools = HashMap::from([("t", true), ("f", false)]);
//!
//! let input = scheduler.hot_timeline("f--t--f", &bools);
//! let negated = input.map(|b| !b);
//! let recorded = scheduler.record(&negated);
//!
//! scheduler.start();
//!
//! assert_eq!(recorded.events(), parse_values("t--f--t", &bools));
//! ```

pub mod mock;
pub mod notation;
pub mod recorder;
pub mod tests;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use formwire_core::{Event, Observable, Scheduler, Tick};

pub use mock::Mock;
pub use notation::{parse_timeline, parse_values};
pub use recorder::{Recorded, Recorder, completed, error, next};

pub struct TestScheduler {
    scheduler: Scheduler,
}

impl TestScheduler {
    pub fn new(resolution: Duration) -> Self {
        Self {
            scheduler: Scheduler::virtual_time(resolution),
        }
    }

    /// The underlying scheduler, to hand to the code under test.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    /// Observable that emits `events` at their ticks once the clock runs.
    pub fn hot<T: Clone + 'static>(&self, events: &[Recorded<Event<T>>]) -> Observable<T> {
        let out = Observable::new();
        for record in events {
            let out = out.clone();
            let event = record.value.clone();
            let _ = self.scheduler.schedule_at(record.time, move || out.emit(event));
        }
        out
    }

    pub fn hot_timeline<K, T>(&self, timeline: &str, values: &HashMap<K, T>) -> Observable<T>
    where
        K: std::borrow::Borrow<str> + Hash + Eq + Debug,
        T: Clone + 'static,
    {
        self.hot(&parse_values(timeline, values))
    }

    pub fn record<T: Clone + 'static>(&self, observable: &Observable<T>) -> Recorder<T> {
        Recorder::attach(&self.scheduler, observable)
    }

    /// Mocked async capability; `responder` maps call arguments to a
    /// response timeline such as `"---t"` or `"--#timeout"`.
    pub fn mock<A, T, E, R>(
        &self,
        values: &HashMap<&str, T>,
        errors: &HashMap<&str, E>,
        responder: impl Fn(&A) -> R + 'static,
    ) -> Mock<A, T, E>
    where
        A: Clone + 'static,
        T: Clone + 'static,
        E: Clone + 'static,
        R: AsRef<str>,
    {
        Mock::new(
            self.scheduler.clone(),
            owned_keys(values),
            owned_keys(errors),
            Box::new(move |args| responder(args).as_ref().to_owned()),
        )
    }

    /// [`mock`](Self::mock) driven by an argument -> timeline table.
    /// Arguments missing from the table get `fallback`.
    pub fn mock_table<A, T, E>(
        &self,
        values: &HashMap<&str, T>,
        errors: &HashMap<&str, E>,
        table: HashMap<A, &str>,
        fallback: &str,
    ) -> Mock<A, T, E>
    where
        A: Clone + Hash + Eq + 'static,
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let table: HashMap<A, String> = table
            .into_iter()
            .map(|(k, v)| (k, v.to_owned()))
            .collect();
        let fallback = fallback.to_owned();
        self.mock(values, errors, move |args: &A| {
            table.get(args).cloned().unwrap_or_else(|| fallback.clone())
        })
    }

    /// Runs the clock until no scheduled work remains.
    pub fn start(&self) {
        self.scheduler.run();
    }

    pub fn advance_to(&self, tick: Tick) {
        self.scheduler.advance_to(tick);
    }
}

fn owned_keys<V: Clone>(map: &HashMap<&str, V>) -> HashMap<String, V> {
    map.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
}

