//! 浏览器规则执行引擎
pub mod rules;

pub use self::rules::{is_truthy, RuleEngine};

#[cfg(test)]
pub(crate) mod scripted;
