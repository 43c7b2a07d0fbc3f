//! 规则编译器核心
//! 仅负责将原始规则编译为可执行的正则模式

use std::collections::BTreeMap;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::pattern::{CompiledPattern, CompiledRuleLibrary, CompiledTechRule};
use crate::rule::{RuleLibrary, TechRule};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则库
    pub fn compile(rule_lib: &RuleLibrary) -> CompiledRuleLibrary {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut tech_patterns = BTreeMap::new();

        for (tech_name, tech_rule) in &rule_lib.tech_rules {
            let compiled = Self::compile_tech_rule(tech_name, tech_rule, rule_lib, &mut stats);
            tech_patterns.insert(tech_name.clone(), compiled);
        }

        debug!(
            "Rules compiled in {:?}: header={} cookie={} html={} script={} meta={} skipped={}",
            start.elapsed(),
            stats.header_count,
            stats.cookie_count,
            stats.html_count,
            stats.script_count,
            stats.meta_count,
            stats.skipped
        );

        CompiledRuleLibrary { tech_patterns }
    }

    /// 编译单个技术规则
    fn compile_tech_rule(
        tech_name: &str,
        tech_rule: &TechRule,
        rule_lib: &RuleLibrary,
        stats: &mut CompileStats,
    ) -> CompiledTechRule {
        let header_patterns = Self::compile_keyed(tech_name, tech_rule.headers.iter().map(|(k, v)| (k, std::slice::from_ref(v))), stats);
        stats.header_count += header_patterns.len();

        let cookie_patterns: Vec<(String, CompiledPattern)> = tech_rule
            .cookies
            .iter()
            .filter_map(|(name, raw)| {
                Self::compile_or_skip(tech_name, raw, stats).map(|p| (name.clone(), p))
            })
            .collect();
        stats.cookie_count += cookie_patterns.len();

        let html_patterns = Self::compile_list(tech_name, &tech_rule.html.to_vec(), stats);
        stats.html_count += html_patterns.len();

        let script_patterns = Self::compile_list(tech_name, &tech_rule.script_src.to_vec(), stats);
        stats.script_count += script_patterns.len();

        let meta_values: Vec<(&String, Vec<String>)> =
            tech_rule.meta.iter().map(|(k, v)| (k, v.to_vec())).collect();
        let meta_patterns =
            Self::compile_keyed(tech_name, meta_values.iter().map(|(k, v)| (*k, v.as_slice())), stats);
        stats.meta_count += meta_patterns.len();

        // 转换分类ID为分类名称
        let categories = tech_rule
            .category_ids
            .iter()
            .filter_map(|id| rule_lib.category_names.get(id).cloned())
            .collect();

        // implies 可能带 \;confidence:50 之类的标签，只保留技术名
        let implies = tech_rule
            .implies
            .to_vec()
            .into_iter()
            .filter_map(|raw| {
                let name = raw.split("\\;").next().unwrap_or("").trim().to_string();
                (!name.is_empty()).then_some(name)
            })
            .collect();

        CompiledTechRule {
            name: tech_name.to_string(),
            header_patterns,
            cookie_patterns,
            html_patterns,
            script_patterns,
            meta_patterns,
            implies,
            categories,
            description: tech_rule.description.clone(),
            website: tech_rule.website.clone(),
            browser: tech_rule.browser.clone(),
        }
    }

    /// 编译列表型模式（html / scriptSrc）
    fn compile_list(tech_name: &str, raws: &[String], stats: &mut CompileStats) -> Vec<CompiledPattern> {
        raws.iter()
            .filter_map(|raw| Self::compile_or_skip(tech_name, raw, stats))
            .collect()
    }

    /// 编译键值对型模式（header / meta），键统一小写
    fn compile_keyed<'a, I>(tech_name: &str, entries: I, stats: &mut CompileStats) -> Vec<(String, CompiledPattern)>
    where
        I: Iterator<Item = (&'a String, &'a [String])>,
    {
        let mut keyed = Vec::new();
        for (key, raws) in entries {
            for raw in raws {
                if let Some(pattern) = Self::compile_or_skip(tech_name, raw, stats) {
                    keyed.push((key.to_lowercase(), pattern));
                }
            }
        }
        keyed
    }

    fn compile_or_skip(tech_name: &str, raw: &str, stats: &mut CompileStats) -> Option<CompiledPattern> {
        match Self::compile_single_pattern(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                stats.skipped += 1;
                debug!("Skipping pattern for {}: {} ({})", tech_name, raw, e);
                None
            }
        }
    }

    /// 编译单个 Wappalyzer 模式：`regex\;version:\1\;confidence:50`
    pub fn compile_single_pattern(raw_pattern: &str) -> Result<CompiledPattern, regex::Error> {
        // regex 不支持环视，直接移除
        static LOOK_AROUND_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"\(\?<?[=!][^()]*\)").expect("static regex"));

        let mut parts = raw_pattern.split("\\;");
        let regex_part = parts.next().unwrap_or("");
        let version_template = parts
            .find_map(|tag| tag.strip_prefix("version:"))
            .map(str::to_string);

        let cleaned = LOOK_AROUND_REGEX.replace_all(regex_part, "");
        let regex = Regex::new(&format!("(?i){}", cleaned))?;

        Ok(CompiledPattern {
            regex,
            version_template,
        })
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    header_count: usize,
    cookie_count: usize,
    html_count: usize,
    script_count: usize,
    meta_count: usize,
    skipped: usize,
}
