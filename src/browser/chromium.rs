//! 基于 chromiumoxide 的浏览器能力实现
//! 每个会话独立启动一个 Chromium 进程，会话关闭时一并退出

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserCapability, BrowserSession, SessionOptions};
use crate::error::BrowserError;

/// Chromium 浏览器能力
#[derive(Debug, Clone, Default)]
pub struct ChromiumBrowser;

impl ChromiumBrowser {
    pub fn new() -> Self {
        Self
    }

    fn launch_config(options: &SessionOptions) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", options.user_agent));
        if !options.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(BrowserError::SessionSetup)
    }

    async fn navigate(browser: &Browser, url: &str) -> Result<Page, BrowserError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::SessionSetup(e.to_string()))?;
        page.goto(url)
            .await
            .map_err(|e| BrowserError::NavigationTimeout(format!("{}: {}", url, e)))?;
        // body 出现即视为 DOM 就绪
        page.find_element("body")
            .await
            .map_err(|e| BrowserError::NavigationTimeout(format!("{}: {}", url, e)))?;
        Ok(page)
    }
}

#[async_trait]
impl BrowserCapability for ChromiumBrowser {
    async fn open(&self, url: &str, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = Self::launch_config(options)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::SessionSetup(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            // 事件循环必须持续驱动，单个事件的错误不影响会话
            while handler.next().await.is_some() {}
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
        };

        match Self::navigate(&session.browser, url).await {
            Ok(page) => {
                debug!("Browser session ready: {}", url);
                session.page = Some(page);
                Ok(Box::new(session))
            }
            Err(e) => {
                session.shutdown().await;
                Err(e)
            }
        }
    }
}

/// Chromium 会话
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    async fn shutdown(mut self) {
        self.page = None;
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn evaluate(&mut self, expression: &str) -> Result<Value, BrowserError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| BrowserError::Evaluation("page is not open".to_string()))?;
        let result = page
            .evaluate(expression)
            .await
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn close(self: Box<Self>) {
        self.shutdown().await;
    }
}
