//! The single logical thread everything in a form runs on.
//!
//! A [`Scheduler`] owns a clock, a timer queue and a small executor for local
//! (`!Send`) futures. Timers and task continuations only ever run inside
//! [`Scheduler::run`] / [`Scheduler::advance_to`] on the thread that owns the
//! scheduler. Work done elsewhere (a network call on a worker thread) comes
//! back by waking its task: wakers are `Send + Sync` and only push a task key
//! onto a locked ready queue.
//!
//! Two clocks are available:
//!
//! - `virtual_time` jumps straight to the next timer; nothing ever sleeps.
//! - `system` follows wall-clock time and parks the thread between timers.
//!
//! Ordering within one tick is stable: timers fire in the order they were
//! scheduled, and every task woken by a timer callback is polled before the
//! next timer fires.

use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::task::{ArcWake, waker};
use parking_lot::{Condvar, Mutex};
use slotmap::{SlotMap, new_key_type};
use web_time::Instant;

/// Virtual time unit. One tick is one `resolution` of the scheduler.
pub type Tick = u64;

new_key_type! {
    struct TaskKey;
    struct TimerKey;
}

enum Clock {
    Virtual,
    System { origin: Instant },
}

#[derive(Default)]
struct Timers {
    queue: BinaryHeap<Reverse<(Tick, u64, TimerKey)>>,
    actions: SlotMap<TimerKey, Box<dyn FnOnce()>>,
    next_seq: u64,
}

impl Timers {
    fn insert(&mut self, at: Tick, action: Box<dyn FnOnce()>) -> TimerKey {
        let key = self.actions.insert(action);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse((at, seq, key)));
        key
    }

    /// Deadline of the earliest live timer; drops cancelled heads.
    fn peek(&mut self) -> Option<Tick> {
        while let Some(Reverse((at, _, key))) = self.queue.peek().copied() {
            if self.actions.contains_key(key) {
                return Some(at);
            }
            self.queue.pop();
        }
        None
    }

    fn pop(&mut self) -> Option<Box<dyn FnOnce()>> {
        while let Some(Reverse((_, _, key))) = self.queue.pop() {
            if let Some(action) = self.actions.remove(key) {
                return Some(action);
            }
        }
        None
    }
}

struct ReadyQueue {
    queue: Mutex<VecDeque<TaskKey>>,
    wakeup: Condvar,
}

impl ReadyQueue {
    fn push(&self, key: TaskKey) {
        self.queue.lock().push_back(key);
        self.wakeup.notify_one();
    }
}

struct TaskWaker {
    key: TaskKey,
    ready: Arc<ReadyQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.key);
    }
}

struct Inner {
    clock: Clock,
    resolution: Duration,
    now: Cell<Tick>,
    timers: RefCell<Timers>,
    // `None` while the task is being polled.
    tasks: RefCell<SlotMap<TaskKey, Option<LocalBoxFuture<'static, ()>>>>,
    ready: Arc<ReadyQueue>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    /// Deterministic scheduler: time only moves when `run`/`advance_to`
    /// reaches the next timer.
    pub fn virtual_time(resolution: Duration) -> Self {
        Self::with_clock(Clock::Virtual, resolution)
    }

    /// Wall-clock scheduler for running a real form.
    pub fn system(resolution: Duration) -> Self {
        Self::with_clock(
            Clock::System {
                origin: Instant::now(),
            },
            resolution,
        )
    }

    fn with_clock(clock: Clock, resolution: Duration) -> Self {
        assert!(!resolution.is_zero(), "scheduler resolution must be non-zero");
        Self {
            inner: Rc::new(Inner {
                clock,
                resolution,
                now: Cell::new(0),
                timers: RefCell::new(Timers::default()),
                tasks: RefCell::new(SlotMap::with_key()),
                ready: Arc::new(ReadyQueue {
                    queue: Mutex::new(VecDeque::new()),
                    wakeup: Condvar::new(),
                }),
            }),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.inner.clock, Clock::Virtual)
    }

    pub fn resolution(&self) -> Duration {
        self.inner.resolution
    }

    pub fn now(&self) -> Tick {
        if let Clock::System { origin } = &self.inner.clock {
            let elapsed = origin.elapsed().as_nanos() / self.inner.resolution.as_nanos();
            let elapsed = Tick::try_from(elapsed).unwrap_or(Tick::MAX);
            if elapsed > self.inner.now.get() {
                self.inner.now.set(elapsed);
            }
        }
        self.inner.now.get()
    }

    /// Converts a duration to ticks, rounding to the nearest tick.
    pub fn ticks_for(&self, duration: Duration) -> Tick {
        let res = self.inner.resolution.as_nanos();
        let ticks = (duration.as_nanos() + res / 2) / res;
        Tick::try_from(ticks).unwrap_or(Tick::MAX)
    }

    pub fn schedule_at(&self, at: Tick, f: impl FnOnce() + 'static) -> TimerHandle {
        let key = self.inner.timers.borrow_mut().insert(at, Box::new(f));
        log::trace!("scheduler: timer at tick {at}");
        TimerHandle {
            key,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    pub fn schedule_after(&self, delay: Tick, f: impl FnOnce() + 'static) -> TimerHandle {
        self.schedule_at(self.now().saturating_add(delay), f)
    }

    /// Future that resolves `ticks` from now.
    pub fn sleep(&self, ticks: Tick) -> Sleep {
        Sleep {
            scheduler: self.clone(),
            deadline: self.now().saturating_add(ticks),
            shared: Rc::new(SleepShared::default()),
            timer: None,
        }
    }

    pub fn sleep_for(&self, duration: Duration) -> Sleep {
        self.sleep(self.ticks_for(duration))
    }

    /// Queues `fut` to be polled on this scheduler. Dropping the handle
    /// detaches the task; call [`TaskHandle::abort`] to cancel it.
    pub fn spawn(&self, fut: impl Future<Output = ()> + 'static) -> TaskHandle {
        let key = self.inner.tasks.borrow_mut().insert(Some(Box::pin(fut)));
        self.inner.ready.push(key);
        TaskHandle {
            key,
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Number of spawned tasks that have not finished or been aborted.
    pub fn live_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Runs until there is no timer left and no task can make progress.
    pub fn run(&self) {
        self.run_until(None);
    }

    /// Runs every timer due at or before `tick`. A virtual clock ends up at
    /// exactly `tick`.
    pub fn advance_to(&self, tick: Tick) {
        self.run_until(Some(tick));
    }

    fn run_until(&self, limit: Option<Tick>) {
        loop {
            self.drain_ready();

            let next = self.inner.timers.borrow_mut().peek();
            let due = next.filter(|&at| limit.is_none_or(|limit| at <= limit));

            match (&self.inner.clock, due) {
                (Clock::Virtual, Some(at)) => {
                    if at > self.inner.now.get() {
                        self.inner.now.set(at);
                    }
                    self.fire_next();
                }
                (Clock::System { .. }, Some(at)) => {
                    if self.now() >= at {
                        self.fire_next();
                    } else {
                        self.park(Some(at));
                    }
                }
                (Clock::System { .. }, None) if self.live_tasks() > 0 => {
                    if limit.is_some_and(|limit| self.now() >= limit) {
                        break;
                    }
                    // Tasks are waiting on other threads.
                    self.park(limit.or(next));
                }
                (Clock::System { .. }, None) => break,
                (Clock::Virtual, None) => {
                    match limit {
                        Some(limit) if limit > self.inner.now.get() => {
                            self.inner.now.set(limit);
                        }
                        None if self.live_tasks() > 0 => {
                            log::warn!(
                                "scheduler: virtual run stalled, {} task(s) wait on external wakeups",
                                self.live_tasks()
                            );
                        }
                        _ => {}
                    }
                    break;
                }
            }
        }
    }

    fn fire_next(&self) {
        let action = self.inner.timers.borrow_mut().pop();
        if let Some(action) = action {
            action();
        }
    }

    fn drain_ready(&self) {
        loop {
            let key = self.inner.ready.queue.lock().pop_front();
            let Some(key) = key else { break };
            self.poll_task(key);
        }
    }

    fn poll_task(&self, key: TaskKey) {
        let fut = match self.inner.tasks.borrow_mut().get_mut(key) {
            Some(slot) => slot.take(),
            None => return,
        };
        let Some(mut fut) = fut else { return };

        let waker = waker(Arc::new(TaskWaker {
            key,
            ready: self.inner.ready.clone(),
        }));
        let mut cx = Context::from_waker(&waker);

        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                self.inner.tasks.borrow_mut().remove(key);
            }
            Poll::Pending => {
                // Aborted while running: the slot is gone and `fut` drops here.
                if let Some(slot) = self.inner.tasks.borrow_mut().get_mut(key) {
                    *slot = Some(fut);
                }
            }
        }
    }

    fn park(&self, until: Option<Tick>) {
        let ready = &self.inner.ready;
        let mut queue = ready.queue.lock();
        if !queue.is_empty() {
            return;
        }
        match until {
            Some(at) => {
                let ticks = at.saturating_sub(self.now());
                let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
                let timeout = self.inner.resolution.saturating_mul(ticks);
                let _ = ready.wakeup.wait_for(&mut queue, timeout);
            }
            None => ready.wakeup.wait(&mut queue),
        }
    }
}

/// Cancels a scheduled callback.
pub struct TimerHandle {
    key: TimerKey,
    scheduler: Weak<Inner>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        if let Some(inner) = self.scheduler.upgrade() {
            let removed = inner.timers.borrow_mut().actions.remove(self.key);
            drop(removed);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|inner| inner.timers.borrow().actions.contains_key(self.key))
    }
}

/// Handle to a spawned task.
pub struct TaskHandle {
    key: TaskKey,
    scheduler: Weak<Inner>,
}

impl TaskHandle {
    /// Drops the task's future. Whatever it was waiting for can no longer
    /// reach anything downstream.
    pub fn abort(&self) {
        if let Some(inner) = self.scheduler.upgrade() {
            let removed = inner.tasks.borrow_mut().remove(self.key);
            drop(removed);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_none_or(|inner| !inner.tasks.borrow().contains_key(self.key))
    }
}

#[derive(Default)]
struct SleepShared {
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

/// Future returned by [`Scheduler::sleep`].
pub struct Sleep {
    scheduler: Scheduler,
    deadline: Tick,
    shared: Rc<SleepShared>,
    timer: Option<TimerHandle>,
}

impl Sleep {
    pub fn deadline(&self) -> Tick {
        self.deadline
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.shared.fired.get() || self.scheduler.now() >= self.deadline {
            return Poll::Ready(());
        }
        *self.shared.waker.borrow_mut() = Some(cx.waker().clone());
        if self.timer.is_none() {
            let shared = self.shared.clone();
            let timer = self.scheduler.schedule_at(self.deadline, move || {
                shared.fired.set(true);
                let waker = shared.waker.borrow_mut().take();
                if let Some(waker) = waker {
                    waker.wake();
                }
            });
            self.timer = Some(timer);
        }
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
