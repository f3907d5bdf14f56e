pub mod cell;
pub mod columns;
pub mod task;

pub use cell::*;
pub use columns::*;
pub use task::*;
