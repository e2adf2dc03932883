//! Daily trigger scheduling in the configured timezone.

pub mod engine;
pub mod history;
pub mod slot;

use thiserror::Error;

pub use self::engine::{ScheduleHandle, ScheduleState, ScheduledJob, TriggerScheduler};
pub use self::history::{RunRecord, Trigger};
pub use self::slot::{SlotSummary, TriggerSlot};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid trigger time {hour:02}:{minute:02} (hour 0-23, minute 0-59)")]
    InvalidSlot { hour: u32, minute: u32 },

    #[error("at least one trigger slot is required")]
    NoSlots,

    #[error("trigger slot {0} is configured more than once")]
    DuplicateSlot(String),
}
