//! # Observables, Scopes, and the Scheduler
//!
//! Formwire runs a form on a small single-threaded reactive core. There are
//! three main pieces:
//!
//! - `Observable<T>`: a hot, push-based stream of values.
//! - `Scope` / `effect`: lifecycle for everything subscribed while building
//!   a view-model.
//! - `Scheduler`: one logical thread with a clock, timers and a task
//!   executor. The clock is either virtual (tests) or the system clock.
//!
//! ## Observables
//!
//! ```rust
//! use formwire_core::*;
//!
//! let text = observable::<String>();
//! let lengths = text.map(|s| s.len()).distinct_until_changed();
//! let _sub = lengths.subscribe_next(|n| assert!(*n > 0));
//!
//! text.next("abc".into());
//! assert_eq!(lengths.latest(), Some(3));
//! ```
//!
//! `combine_latest2`/`combine_latest3` recompute synchronously whenever any
//! input changes. `debounce` and `flat_map_latest` are the only operators
//! that involve the scheduler.
//!
//! ## Scopes
//!
//! Operators subscribe through `effect`, which registers the subscription in
//! the current scope:
//!
//! ```rust
//! use formwire_core::*;
//!
//! let scope = Scope::new();
//! let input = observable::<u32>();
//! let doubled = scope.run(|| input.map(|v| v * 2));
//!
//! input.next(2);
//! assert_eq!(doubled.latest(), Some(4));
//!
//! scope.dispose();
//! input.next(3);
//! assert_eq!(doubled.latest(), Some(4));
//! ```
//!
//! ## Virtual time
//!
//! ```rust
//! use std::time::Duration;
//! use formwire_core::*;
//!
//! let scheduler = Scheduler::virtual_time(Duration::from_millis(100));
//! let input = observable::<&'static str>();
//! let quiet = input.debounce(&scheduler, Duration::from_millis(300));
//!
//! scheduler.schedule_at(0, { let input = input.clone(); move || input.next("a") });
//! scheduler.schedule_at(1, { let input = input.clone(); move || input.next("ab") });
//! scheduler.run();
//!
//! assert_eq!(quiet.latest(), Some("ab"));
//! assert_eq!(scheduler.now(), 4);
//! ```

pub mod effects;
pub mod error;
pub mod observable;
pub mod operators;
pub mod prelude;
pub mod scheduler;
pub mod scope;
pub mod tests;

pub use effects::*;
pub use error::*;
pub use observable::*;
pub use operators::*;
pub use scheduler::*;
pub use scope::*;
