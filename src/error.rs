//! 全局错误类型定义
//! 按关注点划分：抓取 / 浏览器 / 输出 / 全局

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// 单次抓取失败（对该 URL 是终止性的，但不影响整个批次）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Network(String),
    #[error("redirect to different domain not allowed: {from} -> {to}")]
    CrossDomainRedirect { from: String, to: String },
    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),
}

/// 浏览器阶段错误
/// Evaluation 仅影响单条规则；其余两类使整个增强阶段降级为静态结果
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("browser session setup failed: {0}")]
    SessionSetup(String),
    #[error("navigation failed or timed out: {0}")]
    NavigationTimeout(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// 输出端写入失败（对整个批次是致命的）
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write result: {0}")]
    Io(#[from] IoError),
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] SerdeJsonError),
}

#[derive(Error, Debug)]
pub enum ProbeError {
    // 规则相关错误
    #[error("failed to load fingerprints: {0}")]
    RuleLoadError(String),
    #[error("failed to parse fingerprints: {0}")]
    RuleParseError(String),

    // 扫描相关错误
    #[error("no URLs provided (use command-line args, -l flag, or pipe input)")]
    NoUrls,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Sink(#[from] SinkError),

    // 基础错误
    #[error("JSON error: {0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::CrossDomainRedirect {
            from: "example.com".to_string(),
            to: "evil.com".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "redirect to different domain not allowed: example.com -> evil.com"
        );
        assert_eq!(FetchError::TooManyRedirects(10).to_string(), "stopped after 10 redirects");
    }

    #[test]
    fn test_fetch_error_is_transparent_in_probe_error() {
        let err: ProbeError = FetchError::Network("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "request failed: connection refused");
    }
}
