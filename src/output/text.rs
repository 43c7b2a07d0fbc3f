//! 文本输出
use std::io::Write;

use super::OutputSink;
use crate::detector::ScanResult;
use crate::error::SinkError;

/// 描述最大长度（超出截断为 97 个字符 + "..."）
const MAX_DESCRIPTION_CHARS: usize = 100;

pub struct TextSink<W: Write + Send> {
    writer: W,
    detailed: bool,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(writer: W, detailed: bool) -> Self {
        Self { writer, detailed }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_simple(&mut self, result: &ScanResult, mode: &str) -> std::io::Result<()> {
        writeln!(self.writer, "\n{} [{}]", result.url, mode)?;
        if result.technologies.is_empty() {
            writeln!(self.writer, "  No technologies detected")?;
        }
        for record in result.technologies.values() {
            writeln!(self.writer, "  [OK] {}", record)?;
        }
        Ok(())
    }

    fn write_detailed(&mut self, result: &ScanResult, mode: &str) -> std::io::Result<()> {
        writeln!(self.writer, "\n{} [{}]", result.url, mode)?;
        writeln!(self.writer, "{}", "=".repeat(result.url.len() + mode.len() + 3))?;
        if result.technologies.is_empty() {
            writeln!(self.writer, "  No technologies detected")?;
        }

        for record in result.technologies.values() {
            if record.version.is_empty() {
                writeln!(self.writer, "\n  {}", record.name)?;
            } else {
                writeln!(self.writer, "\n  {} (v{})", record.name, record.version)?;
            }
            if !record.categories.is_empty() {
                writeln!(self.writer, "    Categories: {}", record.categories.join(", "))?;
            }
            if let Some(website) = record.website.as_deref().filter(|w| !w.is_empty()) {
                writeln!(self.writer, "    Website: {}", website)?;
            }
            if let Some(description) = record.description.as_deref().filter(|d| !d.is_empty()) {
                writeln!(self.writer, "    Description: {}", truncate_description(description))?;
            }
        }
        Ok(())
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_CHARS {
        return description.to_string();
    }
    let head: String = description.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
    format!("{}...", head)
}

impl<W: Write + Send> OutputSink for TextSink<W> {
    fn write(&mut self, result: &ScanResult) -> Result<(), SinkError> {
        if let Some(error) = &result.error {
            writeln!(self.writer, "\n{} [error]\n  {}", result.url, error)?;
        } else {
            let mode = result.mode.map(|m| m.as_str()).unwrap_or("unknown");
            if self.detailed {
                self.write_detailed(result, mode)?;
            } else {
                self.write_simple(result, mode)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanMode;
    use crate::rule::{TechnologyRecord, TechnologySet};

    fn render(result: &ScanResult, detailed: bool) -> String {
        let mut sink = TextSink::new(Vec::new(), detailed);
        sink.write(result).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_simple_text_sorted() {
        let mut techs = TechnologySet::new();
        techs.insert("PHP".to_string(), TechnologyRecord::from_name("PHP").with_version("8.1"));
        techs.insert("Nginx".to_string(), TechnologyRecord::from_name("Nginx"));
        let result = ScanResult::completed("https://example.com", ScanMode::Static, techs);

        assert_eq!(
            render(&result, false),
            "\nhttps://example.com [static]\n  [OK] Nginx\n  [OK] PHP:8.1\n"
        );
    }

    #[test]
    fn test_error_and_empty() {
        let failed = ScanResult::failed("https://down.example", "request failed: refused");
        assert_eq!(render(&failed, false), "\nhttps://down.example [error]\n  request failed: refused\n");

        let empty = ScanResult::completed("https://x.example", ScanMode::Hybrid, TechnologySet::new());
        assert_eq!(render(&empty, false), "\nhttps://x.example [hybrid]\n  No technologies detected\n");
    }

    #[test]
    fn test_detailed_text_truncates_description() {
        let mut record = TechnologyRecord::from_name("Vue.js").with_version("3.4.0");
        record.categories = vec!["JavaScript frameworks".to_string()];
        record.description = Some("x".repeat(150));
        let mut techs = TechnologySet::new();
        techs.insert("Vue.js".to_string(), record);
        let result = ScanResult::completed("https://v.example", ScanMode::Hybrid, techs);

        let output = render(&result, true);
        assert!(output.contains("  Vue.js (v3.4.0)\n"));
        assert!(output.contains("    Categories: JavaScript frameworks\n"));
        assert!(output.contains(&format!("    Description: {}...\n", "x".repeat(97))));
    }

    #[test]
    fn test_truncate_description_boundary() {
        let exact = "y".repeat(100);
        assert_eq!(truncate_description(&exact), exact);
        assert_eq!(truncate_description(&"y".repeat(101)).chars().count(), 100);
    }
}
