//! 重定向安全策略
//! 每一跳都与最初请求的主机比较，只允许同主机或 www 等价主机

use std::fmt;

use reqwest::redirect::{Attempt, Policy};
use url::Url;

use crate::error::FetchError;

/// 最大重定向次数（第 11 跳失败）
pub const MAX_REDIRECTS: usize = 10;

/// 主机是否等价：完全相同，或任一侧去掉一个前导 `www.` 后相同
pub fn is_safe_redirect(original_host: &str, candidate_host: &str) -> bool {
    let original = original_host.to_ascii_lowercase();
    let candidate = candidate_host.to_ascii_lowercase();
    if original == candidate {
        return true;
    }

    let bare_original = original.strip_prefix("www.").unwrap_or(&original);
    let bare_candidate = candidate.strip_prefix("www.").unwrap_or(&candidate);
    bare_original == bare_candidate || bare_original == candidate || original == bare_candidate
}

/// 检查单跳：hops 为包括本跳在内已发生的重定向次数
pub fn check_redirect(original: &Url, next: &Url, hops: usize) -> Result<(), FetchError> {
    if hops > MAX_REDIRECTS {
        return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
    }

    let from = original.host_str().unwrap_or_default();
    let to = next.host_str().unwrap_or_default();
    if is_safe_redirect(from, to) {
        Ok(())
    } else {
        Err(FetchError::CrossDomainRedirect {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// 挂在 reqwest 错误链上的策略拒绝原因，抓取完成后再取回
#[derive(Debug)]
pub(crate) struct RedirectViolation(pub(crate) FetchError);

impl fmt::Display for RedirectViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for RedirectViolation {}

/// 构建 reqwest 重定向策略
pub(crate) fn domain_scoped_policy() -> Policy {
    Policy::custom(|attempt: Attempt| {
        // previous()[0] 是最初请求的 URL，长度即本跳序号
        let hops = attempt.previous().len();
        let verdict = match attempt.previous().first() {
            Some(original) => check_redirect(original, attempt.url(), hops),
            None => Ok(()),
        };

        match verdict {
            Ok(()) => attempt.follow(),
            Err(violation) => attempt.error(RedirectViolation(violation)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect_host_pairs() {
        assert!(is_safe_redirect("example.com", "example.com"));
        assert!(is_safe_redirect("example.com", "www.example.com"));
        assert!(is_safe_redirect("www.example.com", "example.com"));
        assert!(is_safe_redirect("Example.COM", "www.example.com"));
        // 单侧去掉 www. 后完全相同
        assert!(is_safe_redirect("www.www.example.com", "www.example.com"));
        assert!(is_safe_redirect("www.example.com", "www.www.example.com"));

        assert!(!is_safe_redirect("example.com", "evil.com"));
        assert!(!is_safe_redirect("sub.example.com", "other.example.com"));
        assert!(!is_safe_redirect("example.com", "sub.example.com"));
        // 只去掉一个 www.
        assert!(!is_safe_redirect("example.com", "www.www.example.com"));
    }

    #[test]
    fn test_check_redirect_hop_cap() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://www.example.com:8443/next").unwrap();

        assert!(check_redirect(&a, &b, 10).is_ok());
        assert_eq!(check_redirect(&a, &b, 11), Err(FetchError::TooManyRedirects(10)));
    }

    #[test]
    fn test_check_redirect_cross_domain() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://evil.com/").unwrap();
        assert_eq!(
            check_redirect(&a, &b, 1),
            Err(FetchError::CrossDomainRedirect {
                from: "example.com".to_string(),
                to: "evil.com".to_string(),
            })
        );
    }
}
