//! 浏览器能力抽象
//! 只暴露两类原语：打开并等待 DOM 就绪、在页面上执行表达式
pub mod chromium;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ScanConfig;
use crate::error::BrowserError;

pub use self::chromium::ChromiumBrowser;

/// 会话选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub headless: bool,
    pub user_agent: String,
}

impl From<&ScanConfig> for SessionOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// 浏览器能力：每次调用打开一个独立会话
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    /// 打开 URL 并等待 DOM 就绪
    async fn open(&self, url: &str, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// 单个 URL 的浏览器会话
#[async_trait]
pub trait BrowserSession: Send {
    /// 在页面上执行表达式，返回 JSON 值（undefined 视为 null）
    async fn evaluate(&mut self, expression: &str) -> Result<Value, BrowserError>;

    /// 释放会话
    async fn close(self: Box<Self>);
}
