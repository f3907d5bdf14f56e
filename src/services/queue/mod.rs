//! Queue service module
//!
//! Reads the queue sheet, selects pending rows and drives each one through
//! processing → complete / pending (retry) / failed.

mod core;
mod processor;

// Re-export public items
pub use self::core::{
    complete_updates, count_by_status, failed_updates, failure_step, get_pending_tasks,
    process_id, processing_updates, retry_updates, task_row, test_row, FailureStep, QueueCounts,
};
pub use self::processor::{run_recorded, ProcessorSettings, QueueProcessor};
