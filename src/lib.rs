//! rswappalyzer-probe - 混合式网站技术栈识别
//! 静态指纹匹配 + 浏览器规则验证与版本增强

// 导出全局错误类型
pub use self::error::{BrowserError, FetchError, ProbeError, ProbeResult, SinkError};

// 导出配置
pub use self::config::{FingerprintSource, ScanConfig, ScanConfigBuilder, ScanMode, DEFAULT_USER_AGENT};

// 导出规则模块核心接口
pub use self::rule::{
    BrowserRules, DetectionRule, RuleLibrary, RuleLoader, TechRule, TechnologyRecord, TechnologySet,
    VersionRule,
};

// 导出编译与签名匹配接口
pub use self::compiler::{CompiledRuleLibrary, RuleCompiler};
pub use self::oracle::{FingerprintOracle, SignatureOracle};

// 导出流水线核心接口
pub use self::browser::{BrowserCapability, BrowserSession, ChromiumBrowser, SessionOptions};
pub use self::detector::{ScanResult, TechDetector};
pub use self::engine::RuleEngine;
pub use self::fetcher::{is_safe_redirect, FetchedPage, SafeFetcher};
pub use self::output::{create_sink, OutputFormat, OutputSink};
pub use self::scanner::{ScanSummary, Scheduler};

// 声明所有子模块
pub mod browser;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod input;
pub mod logging;
pub mod oracle;
pub mod output;
pub mod rule;
pub mod scanner;
