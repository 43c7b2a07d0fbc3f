//! Signature oracle module
//! 签名匹配：给定响应头与响应体返回候选技术，并提供每个技术的浏览器规则描述
pub mod analyzer;
pub mod fingerprint;

use reqwest::header::HeaderMap;

use crate::rule::{BrowserRules, TechnologyRecord, TechnologySet};

pub use self::fingerprint::FingerprintOracle;

/// 签名匹配器接口
/// 编译完成后只读，所有工作线程无锁共享
pub trait SignatureOracle: Send + Sync {
    /// 静态匹配：响应头 + 响应体 -> 技术集合
    fn match_technologies(&self, headers: &HeaderMap, body: &[u8]) -> TechnologySet;

    /// 声明了浏览器规则的全部技术名（有序）
    fn browser_technologies(&self) -> Vec<&str>;

    /// 单个技术的浏览器规则
    fn browser_rules_for(&self, name: &str) -> Option<&BrowserRules>;

    /// 浏览器阶段新发现技术时使用的元数据
    fn record_for(&self, name: &str) -> TechnologyRecord {
        TechnologyRecord::from_name(name)
    }
}
