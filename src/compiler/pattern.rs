//! 编译后模式模型
//! 正则编译后的结构，以及基于版本模板的版本号提取

use std::collections::BTreeMap;

use regex::{Captures, Regex};

use crate::rule::BrowserRules;

/// 编译后的正则模式
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    /// 版本模板，支持 \1 / $1 分组引用
    pub version_template: Option<String>,
}

impl CompiledPattern {
    /// 匹配输入：未命中返回 None；命中返回 Some(版本)，版本可能为空
    pub fn match_version(&self, input: &str) -> Option<Option<String>> {
        let captures = self.regex.captures(input)?;
        Some(self.version_from(&captures))
    }

    /// 根据版本模板从捕获结果中提取版本号
    /// 模板未发生任何替换、结果为空或残留占位符时视为无版本
    pub fn version_from(&self, captures: &Captures) -> Option<String> {
        let template = self.version_template.as_deref()?.trim();
        if template.is_empty() {
            return None;
        }

        let mut version = template.to_string();
        let mut replaced = false;

        // 0 是整体匹配，不参与版本提取
        for group_index in 1..captures.len() {
            let value = captures
                .get(group_index)
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            let backslash = format!("\\{}", group_index);
            let dollar = format!("${}", group_index);

            if version.contains(&backslash) || version.contains(&dollar) {
                replaced |= !value.is_empty();
                version = version.replace(&backslash, value).replace(&dollar, value);
            }
        }

        let version = version.trim().to_string();
        if !replaced || version.is_empty() || version.contains('\\') || version.contains('$') {
            return None;
        }
        Some(version)
    }
}

/// 技术编译后的规则
#[derive(Debug, Clone, Default)]
pub struct CompiledTechRule {
    pub name: String,
    /// (小写 header 名, 模式)
    pub header_patterns: Vec<(String, CompiledPattern)>,
    /// (cookie 名, 模式)
    pub cookie_patterns: Vec<(String, CompiledPattern)>,
    pub html_patterns: Vec<CompiledPattern>,
    pub script_patterns: Vec<CompiledPattern>,
    /// (小写 meta 名, 模式)
    pub meta_patterns: Vec<(String, CompiledPattern)>,
    pub implies: Vec<String>,
    pub categories: Vec<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub browser: Option<BrowserRules>,
}

/// 编译后的规则库（只读，编译完成后在所有工作线程间共享）
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleLibrary {
    pub tech_patterns: BTreeMap<String, CompiledTechRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(regex: &str, template: Option<&str>) -> CompiledPattern {
        CompiledPattern {
            regex: Regex::new(regex).unwrap(),
            version_template: template.map(str::to_string),
        }
    }

    #[test]
    fn test_backslash_and_dollar_placeholders() {
        let p = pattern(r"nginx(?:/([\d.]+))?", Some("\\1"));
        assert_eq!(p.match_version("nginx/1.21.6"), Some(Some("1.21.6".to_string())));

        let p = pattern(r"(\w+)/v([\d.]+)-(\w+)", Some("\\1-$2-\\3"));
        assert_eq!(
            p.match_version("rust/v1.75.0-stable"),
            Some(Some("rust-1.75.0-stable".to_string()))
        );
    }

    #[test]
    fn test_missing_group_yields_no_version() {
        let p = pattern(r"nginx(?:/([\d.]+))?", Some("\\1"));
        assert_eq!(p.match_version("nginx"), Some(None));

        // 引用不存在的分组
        let p = pattern(r"nginx(?:/([\d.]+))?", Some("\\2"));
        assert_eq!(p.match_version("nginx/1.21.6"), Some(None));
    }

    #[test]
    fn test_no_match() {
        let p = pattern(r"^apache", None);
        assert_eq!(p.match_version("nginx"), None);
        assert_eq!(p.match_version("apache"), Some(None));
    }
}
