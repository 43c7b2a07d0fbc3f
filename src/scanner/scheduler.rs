//! 扫描调度器
//! 固定数量的工作任务从已关闭的任务队列中取 URL，结果经有界通道交给唯一的汇聚循环写出

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::detector::{ScanResult, TechDetector};
use crate::error::{ProbeError, ProbeResult, SinkError};
use crate::output::OutputSink;

/// 一次批量扫描的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    /// 成功写出的结果数
    pub written: usize,
    /// 带错误的结果数（无论是否写出）
    pub failed: usize,
    /// 输出端失败后被丢弃的结果数
    pub discarded: usize,
}

/// 扫描调度器
pub struct Scheduler {
    detector: TechDetector,
}

impl Scheduler {
    pub fn new(detector: TechDetector) -> Self {
        Self { detector }
    }

    /// 扫描全部 URL，结果按完成顺序写入输出端
    /// 输出端出错后不再写入，等待所有进行中的任务结束后返回该错误
    pub async fn run(&self, urls: Vec<String>, sink: &mut dyn OutputSink) -> ProbeResult<ScanSummary> {
        if urls.is_empty() {
            return Err(ProbeError::NoUrls);
        }

        let total = urls.len();
        let concurrency = self.detector.config().concurrency.max(1);

        // 任务队列：一次性装满后关闭
        let (job_tx, job_rx) = mpsc::channel::<String>(total);
        for url in urls {
            if job_tx.send(url).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let detectors = (0..concurrency)
            .map(|_| self.detector.fork())
            .collect::<ProbeResult<Vec<_>>>()?;

        let (result_tx, result_rx) = mpsc::channel::<ScanResult>(concurrency);
        let mut workers = Vec::with_capacity(concurrency);
        for (worker_id, detector) in detectors.into_iter().enumerate() {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(url) = next else {
                        break;
                    };
                    let result = detector.run(&url).await;
                    if results.send(result).await.is_err() {
                        break;
                    }
                }
                debug!("Worker {} finished", worker_id);
            }));
        }
        drop(result_tx);

        let summary = ScanSummary {
            total,
            ..ScanSummary::default()
        };
        let (summary, sink_error) = drain(result_rx, sink, summary).await;

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Scan worker terminated abnormally: {}", e);
            }
        }

        match sink_error {
            Some(e) => {
                error!("{} results discarded after output failure", summary.discarded);
                Err(e.into())
            }
            None => Ok(summary),
        }
    }
}

/// 唯一的汇聚循环：按完成顺序写出，输出端首次出错后其余结果只计数丢弃
async fn drain(
    mut results: mpsc::Receiver<ScanResult>,
    sink: &mut dyn OutputSink,
    mut summary: ScanSummary,
) -> (ScanSummary, Option<SinkError>) {
    let mut sink_error: Option<SinkError> = None;

    while let Some(result) = results.recv().await {
        if result.is_error() {
            summary.failed += 1;
        }
        if sink_error.is_some() {
            summary.discarded += 1;
            continue;
        }
        match write_blocking(sink, &result) {
            Ok(()) => summary.written += 1,
            Err(e) => {
                error!("Output failed, discarding remaining results: {}", e);
                summary.discarded += 1;
                sink_error = Some(e);
            }
        }
    }

    (summary, sink_error)
}

/// 输出端是同步 I/O：多线程运行时下让出工作线程，单线程运行时直接写
fn write_blocking(sink: &mut dyn OutputSink, result: &ScanResult) -> Result<(), SinkError> {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| sink.write(result)),
        _ => sink.write(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScanConfig, ScanMode};
    use crate::oracle::FingerprintOracle;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct CollectingSink {
        results: Vec<ScanResult>,
    }

    impl OutputSink for CollectingSink {
        fn write(&mut self, result: &ScanResult) -> Result<(), SinkError> {
            self.results.push(result.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    /// 第一次写入即失败，并记录写入次数
    #[derive(Default)]
    struct FailingSink {
        attempts: usize,
    }

    impl OutputSink for FailingSink {
        fn write(&mut self, _result: &ScanResult) -> Result<(), SinkError> {
            self.attempts += 1;
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        let routes = [
            ("/php", "X-Powered-By", "PHP/8.1"),
            ("/nginx", "Server", "nginx/1.25.3"),
            ("/express", "X-Powered-By", "Express"),
            ("/plain", "X-Nothing", "1"),
        ];
        for (route, name, value) in routes {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).insert_header(name, value))
                .mount(&server)
                .await;
        }
        server
    }

    fn urls(server: &MockServer) -> Vec<String> {
        let mut urls: Vec<String> = ["/php", "/nginx", "/express", "/plain"]
            .iter()
            .map(|route| format!("{}{}", server.uri(), route))
            .collect();
        urls.push("::not-a-url::".to_string());
        urls
    }

    fn scheduler(concurrency: usize) -> Scheduler {
        let config = ScanConfig::builder()
            .mode(ScanMode::Static)
            .concurrency(concurrency)
            .timeout(Duration::from_secs(10))
            .build();
        let oracle = Arc::new(FingerprintOracle::embedded().unwrap());
        Scheduler::new(TechDetector::new(config, oracle).unwrap())
    }

    fn by_url(results: &[ScanResult]) -> BTreeMap<String, BTreeMap<String, String>> {
        results
            .iter()
            .map(|r| {
                let techs = r.versions().map(|(n, v)| (n.to_string(), v.to_string())).collect();
                (r.url.clone(), techs)
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_does_not_change_results() {
        let server = server().await;

        let mut serial = CollectingSink::default();
        let summary = scheduler(1).run(urls(&server), &mut serial).await.unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.written, 5);
        assert_eq!(summary.failed, 1);

        let mut parallel = CollectingSink::default();
        scheduler(8).run(urls(&server), &mut parallel).await.unwrap();

        assert_eq!(by_url(&serial.results), by_url(&parallel.results));
        let serial = by_url(&serial.results);
        assert_eq!(serial[&format!("{}/php", server.uri())]["PHP"], "8.1");
        assert_eq!(serial[&format!("{}/express", server.uri())].len(), 2);
    }

    #[tokio::test]
    async fn test_sink_error_returned_after_drain() {
        let server = server().await;
        let mut sink = FailingSink::default();
        let result = scheduler(2).run(urls(&server), &mut sink).await;

        assert!(matches!(result, Err(ProbeError::Sink(SinkError::Io(_)))));
        // 首次失败后不再写入，但所有已排队的任务仍然执行完毕
        assert_eq!(sink.attempts, 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drain_discards_after_first_failure() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(ScanResult::completed("https://a.test", ScanMode::Static, Default::default()))
            .await
            .unwrap();
        tx.send(ScanResult::failed("https://b.test", "connection refused"))
            .await
            .unwrap();
        tx.send(ScanResult::completed("https://c.test", ScanMode::Static, Default::default()))
            .await
            .unwrap();
        drop(tx);

        let mut sink = FailingSink::default();
        let start = ScanSummary {
            total: 3,
            ..ScanSummary::default()
        };
        let (summary, err) = drain(rx, &mut sink, start).await;

        assert!(matches!(err, Some(SinkError::Io(_))));
        assert_eq!(sink.attempts, 1);
        assert_eq!(
            summary,
            ScanSummary {
                total: 3,
                written: 0,
                failed: 1,
                discarded: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_drain_writes_everything_on_current_thread() {
        let (tx, rx) = mpsc::channel(2);
        tx.send(ScanResult::failed("https://a.test", "timeout")).await.unwrap();
        tx.send(ScanResult::completed("https://b.test", ScanMode::Hybrid, Default::default()))
            .await
            .unwrap();
        drop(tx);

        let mut sink = CollectingSink::default();
        let (summary, err) = drain(rx, &mut sink, ScanSummary::default()).await;

        assert!(err.is_none());
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.discarded, 0);
        assert_eq!(sink.results[0].url, "https://a.test");
    }

    #[tokio::test]
    async fn test_no_urls() {
        let mut sink = CollectingSink::default();
        let result = scheduler(1).run(Vec::new(), &mut sink).await;
        assert!(matches!(result, Err(ProbeError::NoUrls)));
    }
}
