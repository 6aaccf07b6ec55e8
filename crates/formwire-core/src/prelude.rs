pub use crate::effects::{Dispose, effect, on_dispose};
pub use crate::error::StreamError;
pub use crate::observable::{Event, Observable, observable};
pub use crate::operators::{combine_latest2, combine_latest3};
pub use crate::scheduler::{Scheduler, Sleep, TaskHandle, Tick, TimerHandle};
pub use crate::scope::{Scope, current_scope};
