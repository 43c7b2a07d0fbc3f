//! 安全抓取器
//! 单次 GET 请求，带 User-Agent、总超时与域内重定向策略；非 2xx 响应照常返回
pub mod redirect;

use std::error::Error as StdError;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use tracing::debug;
use url::Url;

use self::redirect::{domain_scoped_policy, RedirectViolation};
use crate::config::ScanConfig;
use crate::error::{FetchError, ProbeError, ProbeResult};

pub use self::redirect::{check_redirect, is_safe_redirect, MAX_REDIRECTS};

/// 抓取结果
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub final_url: String,
}

/// 安全抓取器（每个工作线程持有一个）
#[derive(Debug, Clone)]
pub struct SafeFetcher {
    client: Client,
}

impl SafeFetcher {
    pub fn new(config: &ScanConfig) -> ProbeResult<Self> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ProbeError::InvalidInput(format!("invalid user agent: {}", e)))?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(config.timeout)
            .redirect(domain_scoped_policy())
            .build()
            .map_err(|e| ProbeError::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// 抓取单个 URL
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let target = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self.client.get(target).send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify_error)?.to_vec();

        debug!("Fetched {} -> {} ({}, {} bytes)", url, final_url, status, body.len());

        Ok(FetchedPage {
            status,
            headers,
            body,
            final_url,
        })
    }
}

/// 将 reqwest 错误归类为 FetchError，重定向策略拒绝从错误链中取回
fn classify_error(err: reqwest::Error) -> FetchError {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(RedirectViolation(violation)) = cause.downcast_ref::<RedirectViolation>() {
            return violation.clone();
        }
        source = cause.source();
    }

    if err.is_builder() {
        return FetchError::InvalidUrl(err.to_string());
    }

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    FetchError::Network(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> SafeFetcher {
        let config = ScanConfig::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("rswprobe-test")
            .build();
        SafeFetcher::new(&config).unwrap()
    }

    /// /hop/0 -> /hop/1 -> ... -> /hop/{hops} (200)
    async fn redirect_chain(server: &MockServer, hops: usize) {
        for i in 0..hops {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{}", i)))
                .respond_with(ResponseTemplate::new(302).insert_header("Location", format!("/hop/{}", i + 1)))
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/hop/{}", hops)))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_sends_user_agent_and_returns_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .and(header("user-agent", "rswprobe-test"))
            .respond_with(ResponseTemplate::new(404).insert_header("Server", "nginx").set_body_string("nope"))
            .mount(&server)
            .await;

        let page = fetcher().fetch(&format!("{}/missing", server.uri())).await.unwrap();
        assert_eq!(page.status, 404);
        assert_eq!(page.headers["server"], "nginx");
        assert_eq!(page.body, b"nope");
    }

    #[tokio::test]
    async fn test_ten_redirects_succeed() {
        let server = MockServer::start().await;
        redirect_chain(&server, 10).await;

        let page = fetcher().fetch(&format!("{}/hop/0", server.uri())).await.unwrap();
        assert_eq!(page.status, 200);
        assert!(page.final_url.ends_with("/hop/10"));
        assert_eq!(page.body, b"done");
    }

    #[tokio::test]
    async fn test_eleven_redirects_fail() {
        let server = MockServer::start().await;
        redirect_chain(&server, 11).await;

        let err = fetcher().fetch(&format!("{}/hop/0", server.uri())).await.unwrap_err();
        assert_eq!(err, FetchError::TooManyRedirects(MAX_REDIRECTS));
    }

    #[tokio::test]
    async fn test_cross_domain_redirect_denied() {
        let server = MockServer::start().await;
        let port = server.address().port();
        Mock::given(method("GET"))
            .and(path("/away"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", format!("http://localhost:{}/landing", port)),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("http://127.0.0.1:{}/away", port))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::CrossDomainRedirect {
                from: "127.0.0.1".to_string(),
                to: "localhost".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let f = fetcher();
        assert!(matches!(f.fetch("not a url").await, Err(FetchError::InvalidUrl(_))));
        assert!(matches!(f.fetch("ftp://example.com/").await, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // 先占用再释放端口，得到一个几乎必然无人监听的地址
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = fetcher().fetch(&format!("http://127.0.0.1:{}/", port)).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
