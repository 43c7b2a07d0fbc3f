//! 基于指纹规则库的签名匹配实现
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::HeaderMap;

use super::analyzer::{
    apply_implies, CookieAnalyzer, DetectedMap, HeaderAnalyzer, HtmlAnalyzer, MetaAnalyzer, ScriptAnalyzer,
};
use super::SignatureOracle;
use crate::compiler::{CompiledRuleLibrary, RuleCompiler};
use crate::config::FingerprintSource;
use crate::error::ProbeResult;
use crate::extractor::HtmlExtractor;
use crate::rule::{BrowserRules, RuleLibrary, RuleLoader, TechnologyRecord, TechnologySet};

/// 指纹签名匹配器
#[derive(Debug, Clone)]
pub struct FingerprintOracle {
    compiled_lib: Arc<CompiledRuleLibrary>,
}

impl FingerprintOracle {
    /// 按来源加载并编译规则库
    pub async fn load(source: &FingerprintSource) -> ProbeResult<Self> {
        let rule_lib = RuleLoader::load(source).await?;
        Ok(Self::with_rules(&rule_lib))
    }

    /// 使用内置规则
    pub fn embedded() -> ProbeResult<Self> {
        Ok(Self::with_rules(&RuleLoader::embedded()?))
    }

    /// 使用内存中的规则库
    pub fn with_rules(rule_lib: &RuleLibrary) -> Self {
        Self {
            compiled_lib: Arc::new(RuleCompiler::compile(rule_lib)),
        }
    }

    pub fn technology_count(&self) -> usize {
        self.compiled_lib.tech_patterns.len()
    }

    /// HeaderMap -> 小写名 -> 所有取值
    fn header_values(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            map.entry(key.as_str().to_lowercase()).or_default().push(value);
        }
        map
    }
}

impl SignatureOracle for FingerprintOracle {
    fn match_technologies(&self, headers: &HeaderMap, body: &[u8]) -> TechnologySet {
        let header_values = Self::header_values(headers);
        let cookies = header_values
            .get("set-cookie")
            .map(|values| CookieAnalyzer::parse_set_cookie(values))
            .unwrap_or_default();

        let html: Cow<str> = String::from_utf8_lossy(body);
        let tags = HtmlExtractor::extract(&html);

        let lib = self.compiled_lib.as_ref();
        let mut detected = DetectedMap::new();
        HeaderAnalyzer::analyze(lib, &header_values, &mut detected);
        CookieAnalyzer::analyze(lib, &cookies, &mut detected);
        HtmlAnalyzer::analyze(lib, &html, &mut detected);
        ScriptAnalyzer::analyze(lib, &tags.script_srcs, &mut detected);
        MetaAnalyzer::analyze(lib, &tags.meta_tags, &mut detected);
        apply_implies(lib, &mut detected);

        detected
            .into_iter()
            .map(|(name, version)| {
                let record = self.record_for(&name).with_version(version.unwrap_or_default());
                (name, record)
            })
            .collect()
    }

    fn browser_technologies(&self) -> Vec<&str> {
        self.compiled_lib
            .tech_patterns
            .values()
            .filter(|tech| tech.browser.is_some())
            .map(|tech| tech.name.as_str())
            .collect()
    }

    fn browser_rules_for(&self, name: &str) -> Option<&BrowserRules> {
        self.compiled_lib.tech_patterns.get(name)?.browser.as_ref()
    }

    fn record_for(&self, name: &str) -> TechnologyRecord {
        let Some(tech) = self.compiled_lib.tech_patterns.get(name) else {
            return TechnologyRecord::from_name(name);
        };
        TechnologyRecord {
            name: name.to_string(),
            version: String::new(),
            categories: tech.categories.clone(),
            description: tech.description.clone(),
            website: tech.website.clone(),
        }
    }
}
