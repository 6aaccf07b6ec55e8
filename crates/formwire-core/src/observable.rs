use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::effects::Dispose;
use crate::error::StreamError;

pub type SubId = usize;

/// One notification on an observable.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<T, E = StreamError> {
    Next(T),
    Error(E),
    Completed,
}

impl<T, E> Event<T, E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Event::Next(v) => Some(v),
            _ => None,
        }
    }
}

type Subscriber<T> = Rc<dyn Fn(&Event<T>)>;

/// Hot, push-based, single-threaded multicast stream.
///
/// Emitting notifies the subscribers registered at the moment of the call, in
/// subscription order. Subscribers may emit or subscribe re-entrantly. Once
/// an error or completion went out, later emissions are ignored and late
/// subscribers get the terminal event replayed.
pub struct Observable<T: 'static>(Rc<RefCell<Inner<T>>>);

struct Inner<T> {
    latest: Option<T>,
    terminal: Option<Event<T>>,
    subs: Vec<(SubId, Subscriber<T>)>,
    next_id: SubId,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Inner {
            latest: None,
            terminal: None,
            subs: Vec::new(),
            next_id: 0,
        })))
    }

    /// An observable whose `latest()` starts out as `value`. Nothing is
    /// emitted for the seed.
    pub fn with_value(value: T) -> Self {
        let o = Self::new();
        o.0.borrow_mut().latest = Some(value);
        o
    }

    pub fn latest(&self) -> Option<T> {
        self.0.borrow().latest.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.0.borrow().terminal.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().subs.len()
    }

    pub fn next(&self, value: T) {
        self.emit(Event::Next(value));
    }

    pub fn error(&self, error: StreamError) {
        self.emit(Event::Error(error));
    }

    pub fn complete(&self) {
        self.emit(Event::Completed);
    }

    pub fn emit(&self, event: Event<T>) {
        let subs: SmallVec<[Subscriber<T>; 4]> = {
            let mut inner = self.0.borrow_mut();
            if inner.terminal.is_some() {
                log::trace!("observable: dropping emission after terminal event");
                return;
            }
            match &event {
                Event::Next(v) => inner.latest = Some(v.clone()),
                terminal => inner.terminal = Some(terminal.clone()),
            }
            inner.subs.iter().map(|(_, s)| s.clone()).collect()
        };
        for s in &subs {
            s(&event);
        }
        if event.is_terminal() {
            self.0.borrow_mut().subs.clear();
        }
    }

    pub fn subscribe(&self, f: impl Fn(&Event<T>) + 'static) -> Dispose {
        let terminal = self.0.borrow().terminal.clone();
        if let Some(terminal) = terminal {
            f(&terminal);
            return Dispose::noop();
        }

        let id = {
            let mut inner = self.0.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subs.push((id, Rc::new(f)));
            id
        };
        let weak = Rc::downgrade(&self.0);
        Dispose::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subs.retain(|(sid, _)| *sid != id);
            }
        })
    }

    /// Subscribes to values only.
    pub fn subscribe_next(&self, f: impl Fn(&T) + 'static) -> Dispose {
        self.subscribe(move |event| {
            if let Event::Next(v) = event {
                f(v)
            }
        })
    }

    /// Like `subscribe_next`, but first replays the latest value if there is
    /// one. This is what a renderer attaching late wants.
    pub fn observe(&self, f: impl Fn(&T) + 'static) -> Dispose {
        if let Some(v) = self.latest() {
            f(&v);
        }
        self.subscribe_next(f)
    }
}

pub fn observable<T: Clone + 'static>() -> Observable<T> {
    Observable::new()
}
