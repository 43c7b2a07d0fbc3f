//! 检测模块：单个 URL 的检测流水线与结果模型
pub mod detector;
pub mod result;

pub use self::detector::TechDetector;
pub use self::result::ScanResult;
