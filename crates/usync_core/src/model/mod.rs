//! Change and attempt value types.

mod attempt;
mod change;

pub use attempt::SyncAttempt;
pub use change::{ChangeDetailType, ChangeType, SyncChange, BLANK};
