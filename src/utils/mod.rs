pub mod time;

pub use time::{epoch_millis, format_process_stamp, format_sheet_timestamp, seconds_since};
