//! 详细输出视图：每个技术附带分类、网站与描述
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ScanMode;
use crate::detector::ScanResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedTechnology<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub version: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub categories: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedResult<'a> {
    pub url: &'a str,
    pub technologies: BTreeMap<&'a str, DetailedTechnology<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ScanMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a ScanResult> for DetailedResult<'a> {
    fn from(result: &'a ScanResult) -> Self {
        let technologies = result
            .technologies
            .iter()
            .map(|(name, record)| {
                let details = DetailedTechnology {
                    version: &record.version,
                    categories: &record.categories,
                    description: record.description.as_deref(),
                    website: record.website.as_deref(),
                };
                (name.as_str(), details)
            })
            .collect();

        Self {
            url: &result.url,
            technologies,
            mode: result.mode,
            error: result.error.as_deref(),
        }
    }
}

/// 序列化为 JSON 值（简单或详细视图）
pub(crate) fn to_json(result: &ScanResult, detailed: bool) -> serde_json::Result<serde_json::Value> {
    if detailed {
        serde_json::to_value(DetailedResult::from(result))
    } else {
        serde_json::to_value(result)
    }
}
