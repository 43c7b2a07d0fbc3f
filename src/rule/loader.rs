//! 规则加载管理器
//! 负责从内置数据、单个文件或目录加载指纹规则库
//! 目录模式下所有 JSON 文件在内存中按技术名合并，不经过临时文件

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::{FingerprintFile, RuleLibrary, TechRule};
use crate::config::FingerprintSource;
use crate::error::{ProbeError, ProbeResult};

/// 内置指纹数据
static EMBEDDED_FINGERPRINTS: &str = include_str!("../../data/fingerprints.json");

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 按来源加载规则库
    pub async fn load(source: &FingerprintSource) -> ProbeResult<RuleLibrary> {
        let tech_rules = match source {
            FingerprintSource::Embedded => Self::parse_fingerprints(EMBEDDED_FINGERPRINTS, "<embedded>")?,
            FingerprintSource::File(path) => Self::load_file(path).await?,
            FingerprintSource::Directory(dir) => Self::load_directory(dir).await?,
        };

        debug!("Fingerprints loaded: {} technologies", tech_rules.len());

        Ok(RuleLibrary {
            tech_rules,
            category_names: Self::default_categories(),
        })
    }

    /// 仅加载内置规则（同步版本，测试与嵌入场景使用）
    pub fn embedded() -> ProbeResult<RuleLibrary> {
        Ok(RuleLibrary {
            tech_rules: Self::parse_fingerprints(EMBEDDED_FINGERPRINTS, "<embedded>")?,
            category_names: Self::default_categories(),
        })
    }

    /// 解析 wappalyzergo 格式的指纹 JSON
    pub fn parse_fingerprints(raw: &str, origin: &str) -> ProbeResult<BTreeMap<String, TechRule>> {
        let file: FingerprintFile = serde_json::from_str(raw)
            .map_err(|e| ProbeError::RuleParseError(format!("{}: {}", origin, e)))?;

        file.apps
            .into_iter()
            .map(|(name, value)| {
                let rule: TechRule = serde_json::from_value(value)
                    .map_err(|e| ProbeError::RuleParseError(format!("{}: {}: {}", origin, name, e)))?;
                Ok((name, rule))
            })
            .collect()
    }

    async fn load_file(path: &Path) -> ProbeResult<BTreeMap<String, TechRule>> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProbeError::RuleLoadError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_fingerprints(&raw, &path.display().to_string())
    }

    /// 加载目录下所有 *.json，按路径排序后依次合并（后者覆盖前者）
    async fn load_directory(dir: &Path) -> ProbeResult<BTreeMap<String, TechRule>> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            ProbeError::RuleLoadError(format!("failed to list fingerprint files in {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(ProbeError::RuleLoadError(format!(
                "no fingerprint files found in {}",
                dir.display()
            )));
        }
        files.sort();

        let mut merged = BTreeMap::new();
        for file in &files {
            let apps = Self::load_file(file).await?;
            debug!("Merging {} technologies from {}", apps.len(), file.display());
            merged.extend(apps);
        }

        Ok(merged)
    }

    /// 默认分类表（分类ID -> 名称）
    pub fn default_categories() -> HashMap<u32, String> {
        let default_cats = [
            (1, "CMS"), (2, "Message boards"), (3, "Database managers"), (4, "Documentation"),
            (5, "Widgets"), (6, "Ecommerce"), (7, "Photo galleries"), (8, "Wikis"),
            (9, "Hosting panels"), (10, "Analytics"), (11, "Blogs"), (12, "JavaScript frameworks"),
            (13, "Issue trackers"), (14, "Video players"), (15, "Comment systems"), (16, "Security"),
            (17, "Font scripts"), (18, "Web frameworks"), (19, "Miscellaneous"), (20, "Editors"),
            (22, "Web servers"), (23, "Caching"), (25, "JavaScript graphics"), (27, "Programming languages"),
            (28, "Operating systems"), (31, "CDN"), (36, "Advertising"), (47, "Development"),
            (57, "Static site generator"), (59, "JavaScript libraries"), (62, "PaaS"), (64, "Reverse proxies"),
            (66, "UI frameworks"), (67, "Cookie compliance"), (71, "Affiliate programs"), (87, "Page builders"),
        ];

        default_cats
            .into_iter()
            .map(|(id, name)| (id, name.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::model::DetectionRule;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rswprobe-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_embedded_fingerprints_parse() {
        let lib = RuleLoader::embedded().unwrap();
        assert!(lib.tech_rules.contains_key("PHP"));
        assert!(lib.tech_rules.contains_key("Vue.js"));
        assert_eq!(lib.category_names.get(&27).map(String::as_str), Some("Programming languages"));
    }

    #[tokio::test]
    async fn test_directory_merge_in_memory() {
        let dir = scratch_dir("merge");
        std::fs::write(
            dir.join("a.json"),
            r#"{"apps": {"Alpha": {"cats": [1]}, "Shared": {"cats": [1], "website": "https://old.example"}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("b.json"),
            r#"{"apps": {"Beta": {"browser": {"detection": [{"type": "js-eval", "query": "!!window.beta"}]}},
                         "Shared": {"cats": [2], "website": "https://new.example"}}}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let lib = RuleLoader::load(&FingerprintSource::Directory(dir.clone())).await.unwrap();

        assert_eq!(lib.tech_rules.len(), 3);
        assert_eq!(lib.tech_rules["Shared"].website.as_deref(), Some("https://new.example"));
        assert_eq!(
            lib.tech_rules["Beta"].browser.as_ref().unwrap().detection,
            vec![DetectionRule::JsEval { query: "!!window.beta".to_string() }]
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_empty_directory_is_an_error() {
        let dir = scratch_dir("empty");
        let err = RuleLoader::load(&FingerprintSource::Directory(dir.clone())).await.unwrap_err();
        assert!(matches!(err, ProbeError::RuleLoadError(msg) if msg.contains("no fingerprint files")));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unknown_rule_type_names_technology() {
        let raw = r#"{"apps": {"Widget": {"browser": {"detection": [{"type": "css-magic", "selector": "x"}]}}}}"#;
        let err = RuleLoader::parse_fingerprints(raw, "custom.json").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("custom.json: Widget"));
        assert!(message.contains("css-magic"));
    }

    #[test]
    fn test_bad_json_names_origin() {
        let err = RuleLoader::parse_fingerprints("{\"apps\": 3}", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
