//! 扫描配置
//! 所有可配置项集中在一个不可变的 ScanConfig 中，显式传递给每一层

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0";

/// 检测模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// 仅静态匹配，不启动浏览器
    Static,
    /// 静态匹配 + 浏览器验证/版本增强
    Hybrid,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Static => "static",
            ScanMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 指纹规则来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintSource {
    Embedded,           // 内置规则（编译期 include）
    File(PathBuf),      // 单个 JSON 文件
    Directory(PathBuf), // 目录下所有 *.json，内存合并
}

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: ScanMode,
    // 单个 URL 整条流水线的总超时（含浏览器阶段）
    pub timeout: Duration,
    // 页面就绪后等待延迟脚本执行的时间
    pub settle_delay: Duration,
    pub concurrency: usize,
    pub user_agent: String,
    pub headless: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Hybrid,
            timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            concurrency: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headless: true,
        }
    }
}

impl ScanConfig {
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }

    /// 仅静态模式的快捷构造
    pub fn static_only() -> Self {
        Self {
            mode: ScanMode::Static,
            ..Self::default()
        }
    }
}

/// 配置构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: ScanMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn build(mut self) -> ScanConfig {
        // 并发度至少为 1
        self.config.concurrency = self.config.concurrency.max(1);
        self.config
    }
}
