//! 检测规则与版本提取规则的执行
//! 规则按声明顺序执行；单条规则执行出错只视为该条未命中

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::browser::BrowserSession;
use crate::rule::{DetectionRule, VersionRule};

/// 规则执行引擎（无状态，作用于一个已打开的会话）
pub struct RuleEngine;

impl RuleEngine {
    /// 任一规则为真即返回 true，之后的规则不再执行
    pub async fn detect(session: &mut dyn BrowserSession, rules: &[DetectionRule]) -> bool {
        for rule in rules {
            let script = match rule {
                DetectionRule::DomSelector { selector } => dom_exists_script(selector),
                DetectionRule::JsEval { query } => query.clone(),
            };

            match session.evaluate(&script).await {
                Ok(value) if is_truthy(&value) => return true,
                Ok(_) => {}
                Err(e) => debug!("Detection rule skipped: {:?} ({})", rule, e),
            }
        }
        false
    }

    /// 返回第一个非空版本；全部无结果时返回空串（存在但版本未知）
    pub async fn extract_version(session: &mut dyn BrowserSession, rules: &[VersionRule]) -> String {
        for rule in rules {
            let version = match rule {
                VersionRule::DomAttribute {
                    selector,
                    attribute,
                    pattern,
                } => Self::attribute_version(session, selector, attribute, pattern.as_deref()).await,
                VersionRule::JsEval { query } => Self::eval_version(session, query).await,
            };

            if let Some(version) = version {
                return version;
            }
        }
        String::new()
    }

    async fn attribute_version(
        session: &mut dyn BrowserSession,
        selector: &str,
        attribute: &str,
        pattern: Option<&str>,
    ) -> Option<String> {
        let value = match session.evaluate(&dom_attribute_script(selector, attribute)).await {
            Ok(Value::String(s)) => s,
            Ok(_) => return None,
            Err(e) => {
                debug!("Version rule skipped: {} [{}] ({})", selector, attribute, e);
                return None;
            }
        };
        if value.is_empty() {
            return None;
        }

        let Some(pattern) = pattern else {
            return Some(value);
        };
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                debug!("Invalid version pattern {}: {}", pattern, e);
                return None;
            }
        };
        let captured = regex.captures(&value)?.get(1)?.as_str().trim();
        (!captured.is_empty()).then(|| captured.to_string())
    }

    async fn eval_version(session: &mut dyn BrowserSession, query: &str) -> Option<String> {
        match session.evaluate(query).await {
            Ok(Value::String(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Ok(Value::Number(n)) => Some(n.to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("Version rule skipped: {} ({})", query, e);
                None
            }
        }
    }
}

/// 按 JavaScript 规则转换为布尔值
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 选择器以 JSON 字符串字面量嵌入，避免引号破坏脚本
fn js_literal(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn dom_exists_script(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_literal(selector))
}

pub(crate) fn dom_attribute_script(selector: &str, attribute: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return ''; const v = el.getAttribute({}); return v === null ? '' : String(v); }})()",
        js_literal(selector),
        js_literal(attribute)
    )
}
