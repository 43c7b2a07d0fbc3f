//! 日志初始化：tracing 订阅器输出到标准错误
use tracing_subscriber::EnvFilter;

/// 默认过滤规则：本 crate 与调用方（二进制）target 同一级别
fn default_directive(bin_target: &str, silent: bool) -> String {
    let level = if silent { "error" } else { "info" };
    format!("{}={},{}={}", env!("CARGO_CRATE_NAME"), level, bin_target, level)
}

/// 构建过滤器：静默模式固定为 error，否则优先使用 RUST_LOG
pub fn env_filter(bin_target: &str, silent: bool) -> EnvFilter {
    if silent {
        return EnvFilter::new(default_directive(bin_target, true));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(bin_target, false)))
}

/// 安装全局订阅器（重复调用时忽略）
/// `bin_target` 传入二进制自身的 `env!("CARGO_CRATE_NAME")`
pub fn init(bin_target: &str, silent: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(bin_target, silent))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
