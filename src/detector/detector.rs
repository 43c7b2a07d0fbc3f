//! 检测流水线：抓取 -> 静态匹配 -> （可选）浏览器验证与版本增强
//! 单个 URL 的整条流水线共享同一个截止时间

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, warn};

use super::result::ScanResult;
use crate::browser::{BrowserCapability, BrowserSession, SessionOptions};
use crate::config::{ScanConfig, ScanMode};
use crate::engine::RuleEngine;
use crate::error::{BrowserError, FetchError, ProbeResult};
use crate::fetcher::SafeFetcher;
use crate::oracle::SignatureOracle;
use crate::rule::TechnologySet;

/// 会话关闭的最长等待时间
const SESSION_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// 技术检测器
#[derive(Clone)]
pub struct TechDetector {
    config: Arc<ScanConfig>,
    oracle: Arc<dyn SignatureOracle>,
    browser: Option<Arc<dyn BrowserCapability>>,
    fetcher: SafeFetcher,
}

impl TechDetector {
    /// 创建检测器（不带浏览器能力时，混合模式会降级为静态结果并给出警告）
    pub fn new(config: ScanConfig, oracle: Arc<dyn SignatureOracle>) -> ProbeResult<Self> {
        let fetcher = SafeFetcher::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            oracle,
            browser: None,
            fetcher,
        })
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserCapability>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// 为工作线程派生一个检测器：共享只读的规则与配置，抓取客户端独立
    pub fn fork(&self) -> ProbeResult<Self> {
        Ok(Self {
            config: Arc::clone(&self.config),
            oracle: Arc::clone(&self.oracle),
            browser: self.browser.clone(),
            fetcher: SafeFetcher::new(&self.config)?,
        })
    }

    /// 检测单个 URL，总能返回结果
    pub async fn run(&self, url: &str) -> ScanResult {
        let deadline = Instant::now() + self.config.timeout;

        let page = match timeout_at(deadline, self.fetcher.fetch(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return ScanResult::failed(url, e),
            Err(_) => {
                let e = FetchError::Network(format!("timed out after {:?}", self.config.timeout));
                return ScanResult::failed(url, e);
            }
        };

        let mut technologies = self.oracle.match_technologies(&page.headers, &page.body);
        debug!("Static match for {}: {} technologies", url, technologies.len());

        if self.config.mode == ScanMode::Static {
            return ScanResult::completed(url, ScanMode::Static, technologies);
        }

        let warning = match self.enhance(url, &mut technologies, deadline).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Browser enhancement skipped for {}: {}", url, e);
                Some(e.to_string())
            }
        };

        let mut result = ScanResult::completed(url, ScanMode::Hybrid, technologies);
        result.warning = warning;
        result
    }

    /// 浏览器增强：失败或超时时保留已经合并的部分结果
    async fn enhance(&self, url: &str, technologies: &mut TechnologySet, deadline: Instant) -> Result<(), BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::SessionSetup("no browser available".to_string()))?;

        let options = SessionOptions::from(self.config.as_ref());
        let mut session = timeout_at(deadline, browser.open(url, &options))
            .await
            .map_err(|_| BrowserError::NavigationTimeout(format!("{}: deadline elapsed while opening page", url)))??;

        let outcome = timeout_at(deadline, self.verify(session.as_mut(), technologies)).await;

        if timeout(SESSION_CLOSE_GRACE, session.close()).await.is_err() {
            warn!("Browser session for {} did not close in time", url);
        }

        outcome.map_err(|_| BrowserError::NavigationTimeout(format!("{}: deadline elapsed during browser checks", url)))
    }

    /// 对每个声明了浏览器规则的技术执行验证与版本提取
    async fn verify(&self, session: &mut dyn BrowserSession, technologies: &mut TechnologySet) {
        if !self.config.settle_delay.is_zero() {
            sleep(self.config.settle_delay).await;
        }

        for name in self.oracle.browser_technologies() {
            let Some(rules) = self.oracle.browser_rules_for(name) else {
                continue;
            };

            // 静态阶段已命中：跳过检测，只尝试补全版本
            if technologies.contains_key(name) {
                if rules.version.is_empty() {
                    continue;
                }
                let version = RuleEngine::extract_version(session, &rules.version).await;
                if let Some(record) = technologies.get_mut(name) {
                    if record.merge_version(&version) {
                        debug!("Browser upgraded version: {} -> {}", name, record.version);
                    }
                }
                continue;
            }

            if !RuleEngine::detect(session, &rules.detection).await {
                continue;
            }
            debug!("Browser detected: {}", name);
            technologies.insert(name.to_string(), self.oracle.record_for(name));

            if rules.version.is_empty() {
                continue;
            }
            let version = RuleEngine::extract_version(session, &rules.version).await;
            if let Some(record) = technologies.get_mut(name) {
                record.merge_version(&version);
            }
        }
    }
}
