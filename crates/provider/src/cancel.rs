//! Bridge from the lifecycle context to engine interruption.

use declarative::{Context, Done};
use tfkit::{Interrupt, Interruption};

/// Lets the engine runner poll a [`Context`].
pub struct ContextInterrupt<'a>(pub &'a Context);

impl Interrupt for ContextInterrupt<'_> {
    fn check(&self) -> Option<Interruption> {
        self.0.status().map(|done| match done {
            Done::Cancelled => Interruption::Cancelled,
            Done::DeadlineExceeded => Interruption::DeadlineExceeded,
        })
    }
}
