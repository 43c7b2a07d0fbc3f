//! 单个 URL 的扫描结果
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::ScanMode;
use crate::rule::TechnologySet;

/// 扫描结果：每个任务恰好产生一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub url: String,
    /// 序列化为 技术名 -> 版本（空串表示版本未知），按名称排序
    #[serde(serialize_with = "serialize_versions")]
    pub technologies: TechnologySet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ScanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 浏览器阶段降级原因（不影响结果本身）
    #[serde(skip)]
    pub warning: Option<String>,
}

impl ScanResult {
    pub fn completed(url: impl Into<String>, mode: ScanMode, technologies: TechnologySet) -> Self {
        Self {
            url: url.into(),
            technologies,
            mode: Some(mode),
            error: None,
            warning: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            url: url.into(),
            technologies: TechnologySet::new(),
            mode: None,
            error: Some(error.to_string()),
            warning: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// 技术名 -> 版本 的有序视图
    pub fn versions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.technologies
            .values()
            .map(|record| (record.name.as_str(), record.version.as_str()))
    }
}

fn serialize_versions<S: Serializer>(technologies: &TechnologySet, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(technologies.len()))?;
    for (name, record) in technologies {
        map.serialize_entry(name, &record.version)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::TechnologyRecord;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let mut techs = TechnologySet::new();
        techs.insert("PHP".to_string(), TechnologyRecord::from_name("PHP").with_version("8.1"));
        techs.insert("Nginx".to_string(), TechnologyRecord::from_name("Nginx"));
        let mut result = ScanResult::completed("https://example.com", ScanMode::Static, techs);
        result.warning = Some("not serialized".to_string());

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "url": "https://example.com",
                "technologies": {"Nginx": "", "PHP": "8.1"},
                "mode": "static"
            })
        );
        // 名称有序
        let rendered = serde_json::to_string(&result).unwrap();
        assert!(rendered.find("Nginx").unwrap() < rendered.find("PHP").unwrap());
    }

    #[test]
    fn test_failed_result() {
        let result = ScanResult::failed("bad", "invalid URL: bad");
        assert!(result.is_error());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"url": "bad", "technologies": {}, "error": "invalid URL: bad"})
        );
    }
}
