//! Combinators over [`Observable`].
//!
//! Every operator returns a fresh hot observable and subscribes to its
//! upstream through [`effect`], so building a graph inside [`Scope::run`]
//! ties all of those subscriptions to the scope.
//!
//! [`Scope::run`]: crate::Scope::run

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::LocalBoxStream;

use crate::effects::effect;
use crate::observable::{Event, Observable};
use crate::scheduler::{Scheduler, TaskHandle, TimerHandle};

impl<T: Clone + 'static> Observable<T> {
    /// Subscribes with `on_next` and forwards terminal events unchanged.
    fn pipe<U: Clone + 'static>(
        &self,
        on_next: impl Fn(&T, &Observable<U>) + 'static,
    ) -> Observable<U> {
        self.pipe_into(Observable::new(), on_next)
    }

    fn pipe_into<U: Clone + 'static>(
        &self,
        out: Observable<U>,
        on_next: impl Fn(&T, &Observable<U>) + 'static,
    ) -> Observable<U> {
        effect({
            let src = self.clone();
            let out = out.clone();
            move || {
                src.subscribe(move |event| match event {
                    Event::Next(v) => on_next(v, &out),
                    Event::Error(e) => out.error(e.clone()),
                    Event::Completed => out.complete(),
                })
            }
        });
        out
    }

    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U> {
        self.pipe(move |v, out| out.next(f(v)))
    }

    /// Mirrors the upstream, but `latest()` reads `initial` until the first
    /// value arrives. The seed itself is never emitted.
    pub fn hold(&self, initial: T) -> Observable<T> {
        self.pipe_into(Observable::with_value(initial), |v, out| out.next(v.clone()))
    }

    pub fn filter(&self, pred: impl Fn(&T) -> bool + 'static) -> Observable<T> {
        self.pipe(move |v, out| {
            if pred(v) {
                out.next(v.clone())
            }
        })
    }

    /// Suppresses values equal to the previous one.
    pub fn distinct_until_changed(&self) -> Observable<T>
    where
        T: PartialEq,
    {
        let last: RefCell<Option<T>> = RefCell::new(None);
        self.pipe(move |v, out| {
            if last.borrow().as_ref() == Some(v) {
                return;
            }
            *last.borrow_mut() = Some(v.clone());
            out.next(v.clone());
        })
    }

    /// Emits a value only after `quiet` has passed without a newer one.
    ///
    /// A quiet period that rounds to zero ticks forwards synchronously.
    /// Completion flushes the pending value; an error discards it.
    pub fn debounce(&self, scheduler: &Scheduler, quiet: Duration) -> Observable<T> {
        let ticks = scheduler.ticks_for(quiet);
        if ticks == 0 {
            return self.pipe(|v, out| out.next(v.clone()));
        }

        let out = Observable::new();
        let pending: Rc<RefCell<Option<T>>> = Rc::new(RefCell::new(None));
        let timer: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        effect({
            let src = self.clone();
            let out = out.clone();
            let scheduler = scheduler.clone();
            move || {
                src.subscribe(move |event| {
                    if let Some(t) = timer.borrow_mut().take() {
                        t.cancel();
                    }
                    match event {
                        Event::Next(v) => {
                            *pending.borrow_mut() = Some(v.clone());
                            let handle = scheduler.schedule_after(ticks, {
                                let pending = pending.clone();
                                let out = out.clone();
                                move || {
                                    let value = pending.borrow_mut().take();
                                    if let Some(v) = value {
                                        out.next(v);
                                    }
                                }
                            });
                            *timer.borrow_mut() = Some(handle);
                        }
                        Event::Error(e) => {
                            *pending.borrow_mut() = None;
                            out.error(e.clone());
                        }
                        Event::Completed => {
                            let value = pending.borrow_mut().take();
                            if let Some(v) = value {
                                out.next(v);
                            }
                            out.complete();
                        }
                    }
                })
            }
        });
        out
    }

    /// Interleaves both sources. Completes once both have completed.
    pub fn merge(&self, other: &Observable<T>) -> Observable<T> {
        let out = Observable::new();
        let remaining = Rc::new(Cell::new(2u8));
        for src in [self.clone(), other.clone()] {
            let out = out.clone();
            let remaining = remaining.clone();
            effect(move || {
                src.subscribe(move |event| match event {
                    Event::Next(v) => out.next(v.clone()),
                    Event::Error(e) => out.error(e.clone()),
                    Event::Completed => {
                        remaining.set(remaining.get() - 1);
                        if remaining.get() == 0 {
                            out.complete();
                        }
                    }
                })
            });
        }
        out
    }

    /// Maps every value to an inner async stream and forwards only the
    /// newest one.
    ///
    /// Each inner stream is drained by a task on `scheduler`. A new upstream
    /// value aborts the previous task before the next one is spawned, so an
    /// item from a superseded inner stream can never be emitted. The output
    /// completes when the upstream has completed and the current inner
    /// stream has ended.
    pub fn flat_map_latest<U, F>(&self, scheduler: &Scheduler, f: F) -> Observable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> LocalBoxStream<'static, U> + 'static,
    {
        let out = Observable::new();
        let current: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));
        let inner_active = Rc::new(Cell::new(false));
        let outer_done = Rc::new(Cell::new(false));

        effect({
            let src = self.clone();
            let out = out.clone();
            let scheduler = scheduler.clone();
            let current = current.clone();
            move || {
                src.subscribe(move |event| match event {
                    Event::Next(v) => {
                        if let Some(prev) = current.borrow_mut().take() {
                            prev.abort();
                        }
                        let mut inner = f(v);
                        inner_active.set(true);
                        let handle = scheduler.spawn({
                            let out = out.clone();
                            let inner_active = inner_active.clone();
                            let outer_done = outer_done.clone();
                            async move {
                                while let Some(item) = inner.next().await {
                                    out.next(item);
                                }
                                inner_active.set(false);
                                if outer_done.get() {
                                    out.complete();
                                }
                            }
                        });
                        *current.borrow_mut() = Some(handle);
                    }
                    Event::Error(e) => {
                        if let Some(prev) = current.borrow_mut().take() {
                            prev.abort();
                        }
                        out.error(e.clone());
                    }
                    Event::Completed => {
                        outer_done.set(true);
                        if !inner_active.get() {
                            out.complete();
                        }
                    }
                })
            }
        });

        // Tearing the graph down also cancels whatever is in flight.
        effect(move || {
            crate::effects::on_dispose(move || {
                if let Some(task) = current.borrow_mut().take() {
                    task.abort();
                }
            })
        });
        out
    }
}

/// Emits `f(a, b)` with the latest value of each source whenever either
/// emits, once both have emitted at least once.
pub fn combine_latest2<A, B, R>(
    a: &Observable<A>,
    b: &Observable<B>,
    f: impl Fn(&A, &B) -> R + 'static,
) -> Observable<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + 'static,
{
    struct Latest<A, B> {
        a: Option<A>,
        b: Option<B>,
        completed: u8,
    }

    let out = Observable::new();
    let state = Rc::new(RefCell::new(Latest {
        a: None,
        b: None,
        completed: 0,
    }));
    let f = Rc::new(f);

    let emit = {
        let out = out.clone();
        let state = state.clone();
        move || {
            let value = {
                let s = state.borrow();
                match (&s.a, &s.b) {
                    (Some(a), Some(b)) => Some(f(a, b)),
                    _ => None,
                }
            };
            if let Some(v) = value {
                out.next(v);
            }
        }
    };
    let emit = Rc::new(emit);

    let terminal = {
        let out = out.clone();
        let state = state.clone();
        move |error: Option<&crate::StreamError>| match error {
            Some(e) => out.error(e.clone()),
            None => {
                let done = {
                    let mut s = state.borrow_mut();
                    s.completed += 1;
                    s.completed == 2
                };
                if done {
                    out.complete();
                }
            }
        }
    };
    let terminal = Rc::new(terminal);

    effect({
        let a = a.clone();
        let state = state.clone();
        let emit = emit.clone();
        let terminal = terminal.clone();
        move || {
            a.subscribe(move |event| match event {
                Event::Next(v) => {
                    state.borrow_mut().a = Some(v.clone());
                    emit();
                }
                Event::Error(e) => terminal(Some(e)),
                Event::Completed => terminal(None),
            })
        }
    });
    effect({
        let b = b.clone();
        move || {
            b.subscribe(move |event| match event {
                Event::Next(v) => {
                    state.borrow_mut().b = Some(v.clone());
                    emit();
                }
                Event::Error(e) => terminal(Some(e)),
                Event::Completed => terminal(None),
            })
        }
    });
    out
}

/// Three-way [`combine_latest2`]. One emission per upstream change.
pub fn combine_latest3<A, B, C, R>(
    a: &Observable<A>,
    b: &Observable<B>,
    c: &Observable<C>,
    f: impl Fn(&A, &B, &C) -> R + 'static,
) -> Observable<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    R: Clone + 'static,
{
    let ab = combine_latest2(a, b, |a, b| (a.clone(), b.clone()));
    combine_latest2(&ab, c, move |(a, b), c| f(a, b, c))
}
