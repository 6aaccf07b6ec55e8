#[cfg(test)]
mod tests {
    use crate::*;
    use formwire_core::{Event, StreamError};
    use futures::FutureExt;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::time::Duration;

    fn harness() -> TestScheduler {
        TestScheduler::new(Duration::from_millis(200))
    }

    #[test]
    fn test_token_sits_at_first_character() {
        let values = HashMap::from([("e", ""), ("u1", "verysecret"), ("x", "x")]);
        let events = parse_values("e---u1--x", &values);
        assert_eq!(
            events,
            vec![next(0, ""), next(4, "verysecret"), next(8, "x")]
        );
    }

    #[test]
    fn test_errors_and_completion() {
        let values = HashMap::from([("t", true)]);
        let errors = HashMap::from([("#1", "boom")]);
        assert_eq!(
            parse_timeline("t--#1", &values, &errors),
            vec![next(0, true), error(3, "boom")]
        );
        assert_eq!(
            parse_timeline("-t-|", &values, &errors),
            vec![next(1, true), completed(3)]
        );
    }

    #[test]
    fn test_empty_timeline() {
        let values: HashMap<&str, i32> = HashMap::new();
        assert!(parse_values("-----", &values).is_empty());
        assert!(parse_values("", &values).is_empty());
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_unknown_token_panics() {
        let values = HashMap::from([("a", 1)]);
        let _ = parse_values("a--b", &values);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_unknown_error_panics() {
        let values = HashMap::from([("a", 1)]);
        let errors: HashMap<&str, &str> = HashMap::new();
        let _ = parse_timeline("a--#x", &values, &errors);
    }

    #[test]
    #[should_panic(expected = "follows a terminal event")]
    fn test_event_after_completion_panics() {
        let values = HashMap::from([("a", 1)]);
        let _ = parse_values("a-|-a", &values);
    }

    #[test]
    fn test_hot_and_record() {
        let h = harness();
        let values = HashMap::from([("a", 1), ("b", 2)]);
        let input = h.hot_timeline("-a---b-|", &values);
        let recorded = h.record(&input.map(|v| v * 10));

        h.start();

        assert_eq!(
            recorded.events(),
            vec![next(1, 10), next(5, 20), completed(7)]
        );
        assert_eq!(recorded.values(), vec![(1, 10), (5, 20)]);
        assert_eq!(h.now(), 7);
    }

    #[test]
    fn test_hot_error() {
        let h = harness();
        let input = h.hot::<i32>(&[next(0, 1), error(2, StreamError::new("down"))]);
        let recorded = h.record(&input);
        h.start();
        assert_eq!(
            recorded.events(),
            vec![next(0, 1), error(2, StreamError::new("down"))]
        );
    }

    #[test]
    fn test_record_stop() {
        let h = harness();
        let values = HashMap::from([("a", 1), ("b", 2)]);
        let input = h.hot_timeline("a---b", &values);
        let recorded = h.record(&input);

        h.advance_to(2);
        recorded.stop();
        h.start();

        assert_eq!(recorded.len(), 1);
        assert_eq!(input.latest(), Some(2));
    }

    #[test]
    fn test_mock_answers_after_offset() {
        let h = harness();
        let bools = HashMap::from([("t", true), ("f", false)]);
        let errors = HashMap::from([("#1", "server down")]);
        let mock = h.mock(&bools, &errors, |name: &String| match name.as_str() {
            "taken" => "--f",
            "broken" => "-#1",
            _ => "----t",
        });

        let answers = Rc::new(RefCell::new(Vec::new()));
        for name in ["free", "taken", "broken"] {
            let call = mock.call(name.to_string());
            let answers = answers.clone();
            let s = h.scheduler().clone();
            h.scheduler().spawn(async move {
                let result = call.await;
                answers.borrow_mut().push((s.now(), result));
            });
        }
        h.start();

        assert_eq!(
            *answers.borrow(),
            vec![(1, Err("server down")), (2, Ok(false)), (4, Ok(true))]
        );
        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.time == 0));
        assert_eq!(calls[1].value, "taken");
    }

    #[test]
    fn test_mock_table_and_call_time() {
        let h = harness();
        let bools = HashMap::from([("t", true), ("f", false)]);
        let errors: HashMap<&str, ()> = HashMap::new();
        let mock = h.mock_table(&bools, &errors, HashMap::from([(7, "-t")]), "---f");

        let late = {
            let mock = mock.clone();
            let s = h.scheduler().clone();
            let seen = Rc::new(RefCell::new(None));
            let out = seen.clone();
            h.scheduler().spawn(async move {
                s.sleep(5).await;
                let v = mock.call(7).await;
                *out.borrow_mut() = Some((s.now(), v));
            });
            seen
        };
        let early = mock.call(1).map(|v| v.ok());

        let early_seen = Rc::new(RefCell::new(None));
        {
            let early_seen = early_seen.clone();
            let s = h.scheduler().clone();
            h.scheduler().spawn(async move {
                let v = early.await;
                *early_seen.borrow_mut() = Some((s.now(), v));
            });
        }
        h.start();

        assert_eq!(*early_seen.borrow(), Some((3, Some(false))));
        assert_eq!(*late.borrow(), Some((6, Ok(true))));
        let times: Vec<_> = mock.calls().iter().map(|c| (c.time, c.value)).collect();
        assert_eq!(times, vec![(0, 1), (5, 7)]);
    }

    #[test]
    fn test_dropped_mock_call_never_answers() {
        let h = harness();
        let bools = HashMap::from([("t", true)]);
        let errors: HashMap<&str, ()> = HashMap::new();
        let mock = h.mock(&bools, &errors, |_: &()| "---t");

        let task = h.scheduler().spawn({
            let call = mock.call(());
            async move {
                let _ = call.await;
                panic!("aborted call resolved");
            }
        });
        h.advance_to(1);
        task.abort();
        h.start();

        assert_eq!(mock.call_count(), 1);
        assert_eq!(h.scheduler().live_tasks(), 0);
    }

    #[test]
    fn test_recorded_events_compare_with_notation() {
        let h = harness();
        let values = HashMap::from([("a", 'a'), ("b", 'b')]);
        let input = h.hot_timeline("a-a-b-b", &values);
        let recorded = h.record(&input.distinct_until_changed());
        h.start();
        let expected: Vec<Recorded<Event<char>>> = parse_values("a---b", &values);
        assert_eq!(recorded.events(), expected);
    }
}
