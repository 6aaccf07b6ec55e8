use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use formwire_core::{Event, Scheduler};

use crate::notation::parse_timeline;
use crate::recorder::Recorded;

struct MockInner<A, T, E> {
    scheduler: Scheduler,
    values: HashMap<String, T>,
    errors: HashMap<String, E>,
    responder: Box<dyn Fn(&A) -> String>,
    calls: RefCell<Vec<Recorded<A>>>,
}

/// Stand-in for a remote async capability.
///
/// Each call asks the responder for a response timeline and resolves with
/// its first record, `offset` ticks after the call. A value becomes `Ok`, an
/// error token becomes `Err`.
pub struct Mock<A: 'static, T: 'static, E: 'static>(Rc<MockInner<A, T, E>>);

impl<A, T, E> Clone for Mock<A, T, E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A, T, E> Mock<A, T, E>
where
    A: Clone + 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn new(
        scheduler: Scheduler,
        values: HashMap<String, T>,
        errors: HashMap<String, E>,
        responder: Box<dyn Fn(&A) -> String>,
    ) -> Self {
        Self(Rc::new(MockInner {
            scheduler,
            values,
            errors,
            responder,
            calls: RefCell::new(Vec::new()),
        }))
    }

    pub fn call(&self, args: A) -> LocalBoxFuture<'static, Result<T, E>> {
        let inner = &self.0;
        let timeline = (inner.responder)(&args);
        let first = parse_timeline(&timeline, &inner.values, &inner.errors)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("mock response timeline {timeline:?} has no events"));

        log::trace!("mock: call at tick {} answers {timeline:?}", inner.scheduler.now());
        inner
            .calls
            .borrow_mut()
            .push(Recorded::new(inner.scheduler.now(), args));

        let sleep = inner.scheduler.sleep(first.time);
        async move {
            sleep.await;
            match first.value {
                Event::Next(v) => Ok(v),
                Event::Error(e) => Err(e),
                Event::Completed => panic!("mock response {timeline:?} completed without a value"),
            }
        }
        .boxed_local()
    }

    /// Every call made so far, stamped with the tick it was made at.
    pub fn calls(&self) -> Vec<Recorded<A>> {
        self.0.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.0.calls.borrow().len()
    }
}
