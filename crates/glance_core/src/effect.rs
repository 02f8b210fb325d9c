use std::time::Duration;

use crate::TimerId;

/// Side effects requested by [`crate::update`]; the runtime owns the timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Msg::AdvanceDue { timer }` after `delay`.
    ScheduleAdvance { timer: TimerId, delay: Duration },
    /// Drop the timer; a late `AdvanceDue` for it is ignored anyway.
    CancelAdvance { timer: TimerId },
}
