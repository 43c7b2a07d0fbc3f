//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// 检测到的技术（静态阶段产生，之后只允许版本合并）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyRecord {
    pub name: String,
    /// 空字符串表示"存在但版本未知"
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl TechnologyRecord {
    /// 从名称快速创建（无版本、无元数据）
    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            categories: Vec::new(),
            description: None,
            website: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 合并版本：只接受非空值，已有版本永远不会被清空
    pub fn merge_version(&mut self, version: &str) -> bool {
        let version = version.trim();
        if version.is_empty() {
            return false;
        }
        self.version = version.to_string();
        true
    }
}

impl fmt::Display for TechnologyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.version)
        }
    }
}

/// 技术名 -> 记录（有序，保证输出稳定）
pub type TechnologySet = BTreeMap<String, TechnologyRecord>;

/// 浏览器检测规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DetectionRule {
    #[serde(rename = "dom-selector")]
    DomSelector { selector: String },
    #[serde(rename = "js-eval")]
    JsEval { query: String },
}

/// 浏览器版本提取规则（按声明顺序尝试）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VersionRule {
    #[serde(rename = "dom-attribute")]
    DomAttribute {
        selector: String,
        attribute: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    #[serde(rename = "js-eval")]
    JsEval { query: String },
}

/// 单个技术的浏览器规则描述
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserRules {
    #[serde(default)]
    pub detection: Vec<DetectionRule>,
    #[serde(default)]
    pub version: Vec<VersionRule>,
}

/// 兼容 "单个字符串" 与 "字符串数组" 两种写法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

/// 技术规则定义（wappalyzergo 指纹格式）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TechRule {
    #[serde(rename = "cats", default, alias = "categories")]
    pub category_ids: Vec<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,

    // 静态检测规则
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub cookies: HashMap<String, String>,
    #[serde(default)]
    pub html: OneOrMany,
    #[serde(rename = "scriptSrc", default)]
    pub script_src: OneOrMany,
    #[serde(default)]
    pub meta: HashMap<String, OneOrMany>,

    // 关联规则
    #[serde(default)]
    pub implies: OneOrMany,

    // 浏览器规则
    #[serde(default)]
    pub browser: Option<BrowserRules>,
}

/// 指纹文件（{"apps": {...}}）
/// 技术规则先保留为原始 JSON，逐个解析以便错误信息带上技术名
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FingerprintFile {
    #[serde(default)]
    pub apps: BTreeMap<String, serde_json::Value>,
}

/// 完整规则库
#[derive(Debug, Clone, Default)]
pub struct RuleLibrary {
    pub tech_rules: BTreeMap<String, TechRule>,
    pub category_names: HashMap<u32, String>,
}
