//! JSON / JSONL 输出
use std::io::Write;

use serde_json::Value;

use super::view::to_json;
use super::OutputSink;
use crate::detector::ScanResult;
use crate::error::SinkError;

/// 收集全部结果，关闭时输出一个 JSON 数组
pub struct JsonSink<W: Write + Send> {
    writer: W,
    detailed: bool,
    results: Vec<Value>,
    closed: bool,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W, detailed: bool) -> Self {
        Self {
            writer,
            detailed,
            results: Vec::new(),
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputSink for JsonSink<W> {
    fn write(&mut self, result: &ScanResult) -> Result<(), SinkError> {
        self.results.push(to_json(result, self.detailed)?);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let results = std::mem::take(&mut self.results);
        serde_json::to_writer_pretty(&mut self.writer, &results)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// 每行一个 JSON 对象，按完成顺序流式输出
pub struct JsonlSink<W: Write + Send> {
    writer: W,
    detailed: bool,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W, detailed: bool) -> Self {
        Self { writer, detailed }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputSink for JsonlSink<W> {
    fn write(&mut self, result: &ScanResult) -> Result<(), SinkError> {
        let line = serde_json::to_string(&to_json(result, self.detailed)?)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
