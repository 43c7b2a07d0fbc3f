//! 批量扫描调度
pub mod scheduler;

pub use self::scheduler::{ScanSummary, Scheduler};
