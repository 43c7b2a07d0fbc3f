//! HTML标签提取器
//! 负责从HTML中提取 script-src 和 meta 标签，供静态匹配使用

use std::cell::RefCell;

use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

/// 页面中提取出的标签数据
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageTags {
    pub script_srcs: Vec<String>,
    /// (小写 name/property, content)
    pub meta_tags: Vec<(String, String)>,
}

/// html5ever 分词回调，只关心开始标签
#[derive(Default)]
struct TagCollector {
    tags: RefCell<PageTags>,
}

impl TokenSink for TagCollector {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        {
            match name.as_ref() {
                "script" => self.collect_script_src(&attrs),
                "meta" => self.collect_meta(&attrs),
                _ => {}
            }
        }
        TokenSinkResult::Continue
    }
}

impl TagCollector {
    fn collect_script_src(&self, attrs: &[Attribute]) {
        if let Some(src) = attrs.iter().find(|a| a.name.local.as_ref() == "src") {
            let src = src.value.trim();
            if !src.is_empty() {
                self.tags.borrow_mut().script_srcs.push(src.to_string());
            }
        }
    }

    fn collect_meta(&self, attrs: &[Attribute]) {
        let mut key = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                // name 优先于 property（og:* 之类）
                "name" => key = Some(attr.value.to_lowercase()),
                "property" if key.is_none() => key = Some(attr.value.to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let (Some(k), Some(c)) = (key, content) {
            self.tags.borrow_mut().meta_tags.push((k, c));
        }
    }
}

/// HTML标签提取器
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// 从HTML字符串提取标签
    pub fn extract(html: &str) -> PageTags {
        let tokenizer = Tokenizer::new(TagCollector::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink.tags.into_inner()
    }
}
