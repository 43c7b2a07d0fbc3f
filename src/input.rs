//! URL 输入：管道标准输入 > -l 列表文件 > 命令行参数
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{ProbeError, ProbeResult};

/// 逐行读取 URL，跳过空行与 `#` 注释行
pub fn read_urls<R: BufRead>(reader: R) -> ProbeResult<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            urls.push(line.to_string());
        }
    }
    Ok(urls)
}

/// 按优先级收集 URL
/// 管道输入为空时继续回落到列表文件与参数
pub fn collect_urls<R: BufRead>(
    piped_stdin: Option<R>,
    list_file: Option<&Path>,
    args: &[String],
) -> ProbeResult<Vec<String>> {
    if let Some(stdin) = piped_stdin {
        let urls = read_urls(stdin)?;
        if !urls.is_empty() {
            info!("Read {} URLs from stdin", urls.len());
            return Ok(urls);
        }
    }

    if let Some(path) = list_file {
        let file = File::open(path).map_err(|e| {
            ProbeError::InvalidInput(format!("failed to open URL list {}: {}", path.display(), e))
        })?;
        let urls = read_urls(BufReader::new(file))?;
        info!("Read {} URLs from {}", urls.len(), path.display());
        return non_empty(urls);
    }

    let urls = args
        .iter()
        .map(|arg| arg.trim())
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect();
    non_empty(urls)
}

fn non_empty(urls: Vec<String>) -> ProbeResult<Vec<String>> {
    if urls.is_empty() {
        Err(ProbeError::NoUrls)
    } else {
        Ok(urls)
    }
}
