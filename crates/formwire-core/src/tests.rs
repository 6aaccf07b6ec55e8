#[cfg(test)]
mod tests {
    use crate::effects::*;
    use crate::observable::*;
    use crate::operators::*;
    use crate::scheduler::*;
    use crate::scope::*;
    use crate::StreamError;
    use futures::StreamExt;
    use futures::stream;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn collect<T: Clone + 'static>(o: &Observable<T>) -> Rc<RefCell<Vec<Event<T>>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _ = o.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    fn values<T: Clone>(events: &Rc<RefCell<Vec<Event<T>>>>) -> Vec<T> {
        events
            .borrow()
            .iter()
            .filter_map(|e| e.value().cloned())
            .collect()
    }

    #[test]
    fn test_observable_basic() {
        let o = observable::<i32>();
        assert_eq!(o.latest(), None);

        let seen = collect(&o);
        o.next(42);
        o.next(100);

        assert_eq!(o.latest(), Some(100));
        assert_eq!(values(&seen), vec![42, 100]);
    }

    #[test]
    fn test_unsubscribe() {
        let o = observable::<i32>();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let sub = o.subscribe_next(move |_| *c.borrow_mut() += 1);

        o.next(1);
        sub.run();
        o.next(2);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(o.subscriber_count(), 0);
    }

    #[test]
    fn test_terminal_ignores_later_and_replays() {
        let o = observable::<i32>();
        let seen = collect(&o);
        o.next(1);
        o.error(StreamError::new("boom"));
        o.next(2);
        o.complete();

        assert_eq!(
            *seen.borrow(),
            vec![Event::Next(1), Event::Error(StreamError::new("boom"))]
        );

        let late = collect(&o);
        assert_eq!(*late.borrow(), vec![Event::Error(StreamError::new("boom"))]);
    }

    #[test]
    fn test_reentrant_emit() {
        let a = observable::<i32>();
        let b = observable::<i32>();
        let _ = a.subscribe_next({
            let b = b.clone();
            move |v| b.next(v * 10)
        });
        let _ = b.subscribe_next({
            let a = a.clone();
            move |v| {
                if *v < 100 {
                    a.next(v + 1)
                }
            }
        });

        a.next(1);
        assert_eq!(a.latest(), Some(11));
        assert_eq!(b.latest(), Some(110));
    }

    #[test]
    fn test_observe_replays_latest() {
        let o = Observable::with_value(7);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _ = o.observe(move |v| sink.borrow_mut().push(*v));
        o.next(8);
        assert_eq!(*seen.borrow(), vec![7, 8]);
    }

    #[test]
    fn test_dispose_runs_once() {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let d = Dispose::new(move || *c.borrow_mut() += 1);
        d.run();
        d.run();
        assert_eq!(*count.borrow(), 1);
        assert!(d.is_disposed());
    }

    #[test]
    fn test_dispose_all_and_scope_own() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let handles = (0..3).map(|i| {
            let order = order.clone();
            Dispose::new(move || order.borrow_mut().push(i))
        });
        let all = Dispose::all(handles);

        let scope = Scope::new();
        scope.own(all.clone());
        assert!(!all.is_disposed());
        scope.dispose();
        all.run();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(all.is_disposed());
    }

    #[test]
    fn test_hold_seeds_latest() {
        let o = observable::<bool>();
        let held = o.hold(false);
        let seen = collect(&held);
        assert_eq!(held.latest(), Some(false));
        assert!(seen.borrow().is_empty());

        o.next(false);
        o.next(true);
        assert_eq!(values(&seen), vec![false, true]);
        assert_eq!(held.latest(), Some(true));
    }

    #[test]
    fn test_scope_explicit_dispose() {
        let cleaned_up = Rc::new(RefCell::new(false));

        let scope = Scope::new();
        let cleaned_up_clone = cleaned_up.clone();
        scope.add_disposer(move || {
            *cleaned_up_clone.borrow_mut() = true;
        });

        assert!(!*cleaned_up.borrow());
        scope.dispose();
        assert!(*cleaned_up.borrow());
        assert!(scope.is_disposed());
    }

    #[test]
    fn test_scope_disposes_operator_graph() {
        let scope = Scope::new();
        let input = observable::<i32>();
        let doubled = scope.run(|| input.map(|v| v * 2));
        assert_eq!(input.subscriber_count(), 1);

        scope.dispose();
        assert_eq!(input.subscriber_count(), 0);
        input.next(3);
        assert_eq!(doubled.latest(), None);
    }

    #[test]
    fn test_effect_without_scope_still_runs() {
        assert!(current_scope().is_none());
        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        let d = effect(move || on_dispose(move || *r.borrow_mut() = true));
        assert!(!*ran.borrow());
        d.run();
        assert!(*ran.borrow());
    }

    #[test]
    fn test_distinct_and_filter() {
        let o = observable::<i32>();
        let out = o.filter(|v| *v >= 0).distinct_until_changed();
        let seen = collect(&out);
        for v in [1, 1, -5, 1, 2, 2, 1] {
            o.next(v);
        }
        assert_eq!(values(&seen), vec![1, 2, 1]);
    }

    #[test]
    fn test_combine_latest_waits_for_both() {
        let a = observable::<i32>();
        let b = observable::<&'static str>();
        let out = combine_latest2(&a, &b, |a, b| format!("{a}{b}"));
        let seen = collect(&out);

        a.next(1);
        a.next(2);
        b.next("x");
        a.next(3);
        b.next("y");

        assert_eq!(values(&seen), vec!["2x", "3x", "3y"]);
    }

    #[test]
    fn test_combine_latest3_single_emission_per_change() {
        let a = observable::<bool>();
        let b = observable::<bool>();
        let c = observable::<bool>();
        let all = combine_latest3(&a, &b, &c, |a, b, c| *a && *b && *c);
        let seen = collect(&all);

        a.next(true);
        b.next(true);
        c.next(false);
        c.next(true);
        b.next(false);

        assert_eq!(values(&seen), vec![false, true, false]);
    }

    #[test]
    fn test_combine_latest_completes_when_all_complete() {
        let a = observable::<i32>();
        let b = observable::<i32>();
        let out = combine_latest2(&a, &b, |a, b| a + b);
        let seen = collect(&out);
        a.next(1);
        b.next(2);
        a.complete();
        assert!(!out.is_terminated());
        b.complete();
        assert_eq!(*seen.borrow(), vec![Event::Next(3), Event::Completed]);
    }

    #[test]
    fn test_merge() {
        let a = observable::<i32>();
        let b = observable::<i32>();
        let out = a.merge(&b);
        let seen = collect(&out);
        a.next(1);
        b.next(2);
        a.complete();
        b.next(3);
        b.complete();
        assert_eq!(
            *seen.borrow(),
            vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Completed]
        );
    }

    #[test]
    fn test_ticks_for_rounds_to_nearest() {
        let s = Scheduler::virtual_time(Duration::from_millis(200));
        assert_eq!(s.ticks_for(Duration::from_millis(300)), 2);
        assert_eq!(s.ticks_for(Duration::from_millis(250)), 1);
        assert_eq!(s.ticks_for(Duration::ZERO), 0);
        assert_eq!(s.ticks_for(Duration::from_secs(1)), 5);
    }

    #[test]
    fn test_timers_fire_in_order() {
        let s = Scheduler::virtual_time(Duration::from_millis(10));
        let log = Rc::new(RefCell::new(Vec::new()));
        for (at, name) in [(5, "c"), (1, "a"), (5, "d"), (3, "b")] {
            let log = log.clone();
            let s2 = s.clone();
            let _ = s.schedule_at(at, move || log.borrow_mut().push((s2.now(), name)));
        }
        s.run();
        assert_eq!(*log.borrow(), vec![(1, "a"), (3, "b"), (5, "c"), (5, "d")]);
        assert_eq!(s.now(), 5);
    }

    #[test]
    fn test_cancelled_timer_does_not_fire() {
        let s = Scheduler::virtual_time(Duration::from_millis(10));
        let fired = Rc::new(RefCell::new(false));
        let f = fired.clone();
        let t = s.schedule_at(4, move || *f.borrow_mut() = true);
        assert!(t.is_pending());
        t.cancel();
        s.run();
        assert!(!*fired.borrow());
        assert_eq!(s.now(), 0);
    }

    #[test]
    fn test_sleep_and_advance_to() {
        let s = Scheduler::virtual_time(Duration::from_millis(10));
        let done = Rc::new(RefCell::new(None));
        let _task = s.spawn({
            let s = s.clone();
            let done = done.clone();
            async move {
                s.sleep(3).await;
                s.sleep(4).await;
                *done.borrow_mut() = Some(s.now());
            }
        });

        s.advance_to(5);
        assert_eq!(s.now(), 5);
        assert_eq!(*done.borrow(), None);

        s.run();
        assert_eq!(*done.borrow(), Some(7));
        assert_eq!(s.live_tasks(), 0);
    }

    #[test]
    fn test_abort_task_drops_future() {
        let s = Scheduler::virtual_time(Duration::from_millis(10));
        let done = Rc::new(RefCell::new(false));
        let task = s.spawn({
            let s = s.clone();
            let done = done.clone();
            async move {
                s.sleep(3).await;
                *done.borrow_mut() = true;
            }
        });
        s.advance_to(1);
        task.abort();
        assert!(task.is_finished());
        s.run();
        assert!(!*done.borrow());
        // The sleep's timer went away with the future.
        assert_eq!(s.now(), 1);
    }

    #[test]
    fn test_debounce_virtual() {
        let s = Scheduler::virtual_time(Duration::from_millis(100));
        let input = observable::<&'static str>();
        let out = input.debounce(&s, Duration::from_millis(300));
        let times = Rc::new(RefCell::new(Vec::new()));
        let _ = out.subscribe_next({
            let times = times.clone();
            let s = s.clone();
            move |v| times.borrow_mut().push((s.now(), *v))
        });

        for (at, v) in [(0, "a"), (1, "ab"), (2, "abc"), (10, "x")] {
            let input = input.clone();
            let _ = s.schedule_at(at, move || input.next(v));
        }
        s.run();

        assert_eq!(*times.borrow(), vec![(5, "abc"), (13, "x")]);
    }

    #[test]
    fn test_debounce_zero_is_synchronous() {
        let s = Scheduler::virtual_time(Duration::from_millis(100));
        let input = observable::<i32>();
        let out = input.debounce(&s, Duration::ZERO);
        input.next(1);
        assert_eq!(out.latest(), Some(1));
    }

    #[test]
    fn test_debounce_completion_flushes_pending() {
        let s = Scheduler::virtual_time(Duration::from_millis(100));
        let input = observable::<i32>();
        let out = input.debounce(&s, Duration::from_millis(500));
        let seen = collect(&out);
        input.next(1);
        input.complete();
        assert_eq!(*seen.borrow(), vec![Event::Next(1), Event::Completed]);
        s.run();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_flat_map_latest_discards_stale_inner() {
        let s = Scheduler::virtual_time(Duration::from_millis(100));
        let input = observable::<u64>();
        // Each value answers after `value` ticks.
        let out = input.flat_map_latest(&s, {
            let s = s.clone();
            move |delay| {
                let delay = *delay;
                let s = s.clone();
                stream::once(async move {
                    s.sleep(delay).await;
                    delay
                })
                .boxed_local()
            }
        });
        let times = Rc::new(RefCell::new(Vec::new()));
        let _ = out.subscribe_next({
            let times = times.clone();
            let s = s.clone();
            move |v| times.borrow_mut().push((s.now(), *v))
        });

        for (at, delay) in [(0, 5), (2, 1), (10, 2)] {
            let input = input.clone();
            let _ = s.schedule_at(at, move || input.next(delay));
        }
        s.run();

        // 5 (due at tick 5) was superseded at tick 2.
        assert_eq!(*times.borrow(), vec![(3, 1), (12, 2)]);
        assert_eq!(s.live_tasks(), 0);
    }

    #[test]
    fn test_flat_map_latest_completes_after_inner() {
        let s = Scheduler::virtual_time(Duration::from_millis(100));
        let input = observable::<u64>();
        let out = input.flat_map_latest(&s, {
            let s = s.clone();
            move |v| {
                let v = *v;
                let s = s.clone();
                stream::once(async move {
                    s.sleep(2).await;
                    v
                })
                .boxed_local()
            }
        });
        let seen = collect(&out);
        input.next(9);
        input.complete();
        s.run();
        assert_eq!(*seen.borrow(), vec![Event::Next(9), Event::Completed]);
    }

    #[test]
    fn test_system_scheduler_marshals_cross_thread_completion() {
        let s = Scheduler::system(Duration::from_millis(1));
        let (tx, rx) = futures::channel::oneshot::channel::<u32>();
        let result = Rc::new(RefCell::new(None));

        let _task = s.spawn({
            let result = result.clone();
            async move {
                *result.borrow_mut() = rx.await.ok();
            }
        });
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let _ = tx.send(7);
        });

        s.run();
        worker.join().expect("worker thread panicked");

        assert_eq!(*result.borrow(), Some(7));
        assert_eq!(s.live_tasks(), 0);
    }

    #[test]
    fn test_system_scheduler_sleeps_between_timers() {
        let s = Scheduler::system(Duration::from_millis(1));
        let fired_at = Rc::new(RefCell::new(None));
        let f = fired_at.clone();
        let s2 = s.clone();
        let _ = s.schedule_after(15, move || *f.borrow_mut() = Some(s2.now()));
        s.run();
        assert!(fired_at.borrow().is_some_and(|t| t >= 15));
    }
}
