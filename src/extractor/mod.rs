//! 提取模块：从响应体中提取静态匹配所需的标签
pub mod html_extractor;

pub use self::html_extractor::{HtmlExtractor, PageTags};
