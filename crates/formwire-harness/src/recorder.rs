use std::cell::RefCell;
use std::rc::Rc;

use formwire_core::{Dispose, Event, Observable, Scheduler, Tick};

/// Something that happened at a virtual time.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded<V> {
    pub time: Tick,
    pub value: V,
}

impl<V> Recorded<V> {
    pub fn new(time: Tick, value: V) -> Self {
        Self { time, value }
    }
}

pub fn next<T, E>(time: Tick, value: T) -> Recorded<Event<T, E>> {
    Recorded::new(time, Event::Next(value))
}

pub fn error<T, E>(time: Tick, error: E) -> Recorded<Event<T, E>> {
    Recorded::new(time, Event::Error(error))
}

pub fn completed<T, E>(time: Tick) -> Recorded<Event<T, E>> {
    Recorded::new(time, Event::Completed)
}

/// Captures every event of an observable together with the tick it
/// happened at.
pub struct Recorder<T: 'static> {
    events: Rc<RefCell<Vec<Recorded<Event<T>>>>>,
    subscription: Dispose,
}

impl<T: Clone + 'static> Recorder<T> {
    pub(crate) fn attach(scheduler: &Scheduler, observable: &Observable<T>) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let subscription = observable.subscribe({
            let events = events.clone();
            let scheduler = scheduler.clone();
            move |event| {
                events
                    .borrow_mut()
                    .push(Recorded::new(scheduler.now(), event.clone()))
            }
        });
        Self {
            events,
            subscription,
        }
    }

    pub fn events(&self) -> Vec<Recorded<Event<T>>> {
        self.events.borrow().clone()
    }

    /// Only the `Next` values, with their ticks.
    pub fn values(&self) -> Vec<(Tick, T)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|r| r.value.value().map(|v| (r.time, v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Stops recording; already captured events are kept.
    pub fn stop(&self) {
        self.subscription.run();
    }
}
