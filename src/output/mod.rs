//! 输出模块：扫描结果的文本 / JSON / JSONL 渲染
//! 所有写入都由调度器的单个汇聚任务完成
pub mod json;
pub mod text;
pub mod view;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::detector::ScanResult;
use crate::error::{ProbeError, ProbeResult, SinkError};

pub use self::json::{JsonSink, JsonlSink};
pub use self::text::TextSink;
pub use self::view::{DetailedResult, DetailedTechnology};

/// 结果输出端
pub trait OutputSink: Send {
    fn write(&mut self, result: &ScanResult) -> Result<(), SinkError>;

    fn close(&mut self) -> Result<(), SinkError>;
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" | "" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(ProbeError::InvalidInput(format!(
                "unsupported format: {} (supported: text, json, jsonl)",
                other
            ))),
        }
    }
}

/// 按格式创建输出端；未指定文件时写到标准输出
pub fn create_sink(format: OutputFormat, detailed: bool, output: Option<&Path>) -> ProbeResult<Box<dyn OutputSink>> {
    let writer: Box<dyn Write + Send> = match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                ProbeError::InvalidInput(format!("failed to create output file {}: {}", path.display(), e))
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    Ok(match format {
        OutputFormat::Text => Box::new(TextSink::new(writer, detailed)),
        OutputFormat::Json => Box::new(JsonSink::new(writer, detailed)),
        OutputFormat::Jsonl => Box::new(JsonlSink::new(writer, detailed)),
    })
}
