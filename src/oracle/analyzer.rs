//! 检测分析器：负责 Header / Cookie / HTML / Script / Meta 的静态匹配
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::compiler::{CompiledPattern, CompiledRuleLibrary};

/// 技术名 -> 版本（None 表示版本未知）
pub type DetectedMap = BTreeMap<String, Option<String>>;

/// 记录一次命中：已存在的技术只在尚无版本时补全版本
pub fn record_match(detected: &mut DetectedMap, tech_name: &str, version: Option<String>) {
    match detected.entry(tech_name.to_string()) {
        Entry::Occupied(mut entry) => {
            if entry.get().is_none() {
                *entry.get_mut() = version;
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(version);
        }
    }
}

/// 依次尝试多个模式，命中即记录
fn match_patterns<'a, I>(detected: &mut DetectedMap, tech_name: &str, patterns: I, input: &str, source: &str)
where
    I: IntoIterator<Item = &'a CompiledPattern>,
{
    for pattern in patterns {
        if let Some(version) = pattern.match_version(input) {
            debug!(
                "{} matched: tech={}, version={:?}, rule={}",
                source,
                tech_name,
                version,
                pattern.regex.as_str()
            );
            record_match(detected, tech_name, version);
        }
    }
}

/// Header分析器
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    /// headers: 小写 header 名 -> 所有取值
    pub fn analyze(compiled_lib: &CompiledRuleLibrary, headers: &HashMap<String, Vec<String>>, detected: &mut DetectedMap) {
        for tech in compiled_lib.tech_patterns.values() {
            for (header_name, pattern) in &tech.header_patterns {
                let Some(values) = headers.get(header_name) else {
                    continue;
                };
                for value in values {
                    match_patterns(detected, &tech.name, std::iter::once(pattern), value, "Header");
                }
            }
        }
    }
}

/// Cookie分析器
pub struct CookieAnalyzer;

impl CookieAnalyzer {
    /// 从 Set-Cookie 取值中解析出 cookie 名 -> 值
    pub fn parse_set_cookie(values: &[String]) -> HashMap<String, String> {
        values
            .iter()
            .filter_map(|raw| {
                let pair = raw.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_lowercase(), value.trim().to_string()))
            })
            .collect()
    }

    pub fn analyze(compiled_lib: &CompiledRuleLibrary, cookies: &HashMap<String, String>, detected: &mut DetectedMap) {
        if cookies.is_empty() {
            return;
        }
        for tech in compiled_lib.tech_patterns.values() {
            for (cookie_name, pattern) in &tech.cookie_patterns {
                if let Some(value) = cookies.get(&cookie_name.to_lowercase()) {
                    match_patterns(detected, &tech.name, std::iter::once(pattern), value, "Cookie");
                }
            }
        }
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn analyze(compiled_lib: &CompiledRuleLibrary, html: &str, detected: &mut DetectedMap) {
        if html.is_empty() {
            return;
        }
        for tech in compiled_lib.tech_patterns.values() {
            match_patterns(detected, &tech.name, &tech.html_patterns, html, "HTML");
        }
    }
}

/// Script分析器
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn analyze(compiled_lib: &CompiledRuleLibrary, script_srcs: &[String], detected: &mut DetectedMap) {
        for src in script_srcs {
            for tech in compiled_lib.tech_patterns.values() {
                match_patterns(detected, &tech.name, &tech.script_patterns, src, "Script");
            }
        }
    }
}

/// Meta分析器
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    pub fn analyze(compiled_lib: &CompiledRuleLibrary, meta_tags: &[(String, String)], detected: &mut DetectedMap) {
        for (meta_name, content) in meta_tags {
            for tech in compiled_lib.tech_patterns.values() {
                let patterns = tech
                    .meta_patterns
                    .iter()
                    .filter(|(name, _)| name == meta_name)
                    .map(|(_, pattern)| pattern);
                match_patterns(detected, &tech.name, patterns, content, "Meta");
            }
        }
    }
}

/// 关联推导（implies）：被推导出的技术以"版本未知"加入，传递闭包
pub fn apply_implies(compiled_lib: &CompiledRuleLibrary, detected: &mut DetectedMap) {
    let mut pending: Vec<String> = detected.keys().cloned().collect();

    while let Some(tech_name) = pending.pop() {
        let Some(tech) = compiled_lib.tech_patterns.get(&tech_name) else {
            continue;
        };
        for implied in &tech.implies {
            if !detected.contains_key(implied) {
                detected.insert(implied.clone(), None);
                pending.push(implied.clone());
            }
        }
    }
}
