//! 规则模块：负责规则的加载与数据模型定义
pub mod loader;
pub mod model;

// 导出核心接口
pub use self::loader::RuleLoader;
pub use self::model::{
    BrowserRules, DetectionRule, FingerprintFile, OneOrMany, RuleLibrary, TechRule,
    TechnologyRecord, TechnologySet, VersionRule,
};
