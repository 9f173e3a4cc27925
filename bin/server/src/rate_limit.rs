//! Per-client request throttling.
//!
//! Each client IP owns a token bucket refilled continuously at
//! `requests_per_window / window`. Reads and writes get separate layers with
//! separate budgets. Requests whose client IP cannot be determined are
//! rejected.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::RETRY_AFTER, Request, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Bucket capacity and refill per window.
    pub requests_per_window: u32,
    pub window_duration: Duration,
    /// Idle time after which a client's bucket is dropped.
    pub cleanup_interval: Duration,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP` when set.
    pub trust_proxy_headers: bool,
}

impl RateLimitConfig {
    /// 600 requests per 10 seconds.
    pub fn reads(trust_proxy_headers: bool) -> Self {
        Self {
            requests_per_window: 600,
            window_duration: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(300),
            trust_proxy_headers,
        }
    }

    /// 100 requests per 10 seconds.
    pub fn writes(trust_proxy_headers: bool) -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(300),
            trust_proxy_headers,
        }
    }
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    fn try_take(&mut self, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let rate = config.requests_per_window as f64 / config.window_duration.as_secs_f64();
        let refill = now.duration_since(self.last_refill).as_secs_f64() * rate;
        self.tokens = (self.tokens + refill).min(config.requests_per_window as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_idle(&self, cleanup_interval: Duration) -> bool {
        self.last_refill.elapsed() > cleanup_interval
    }
}

#[derive(Debug)]
struct Buckets {
    by_ip: HashMap<IpAddr, TokenBucket>,
    config: RateLimitConfig,
    last_cleanup: Instant,
}

impl Buckets {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            by_ip: HashMap::new(),
            config,
            last_cleanup: Instant::now(),
        }
    }

    fn allow(&mut self, ip: IpAddr) -> bool {
        if self.last_cleanup.elapsed() > self.config.cleanup_interval {
            self.evict_idle();
        }
        let capacity = self.config.requests_per_window;
        self.by_ip
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(capacity))
            .try_take(&self.config)
    }

    fn evict_idle(&mut self) {
        let interval = self.config.cleanup_interval;
        let before = self.by_ip.len();
        self.by_ip.retain(|_, bucket| !bucket.is_idle(interval));
        let removed = before - self.by_ip.len();
        if removed > 0 {
            debug!("Evicted {} idle rate limit buckets", removed);
        }
        self.last_cleanup = Instant::now();
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    buckets: Arc<Mutex<Buckets>>,
    trust_proxy_headers: bool,
}

impl RateLimitLayer {
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            trust_proxy_headers: config.trust_proxy_headers,
            buckets: Arc::new(Mutex::new(Buckets::new(config))),
        }
    }

    pub fn for_reads(trust_proxy_headers: bool) -> Self {
        Self::with_config(RateLimitConfig::reads(trust_proxy_headers))
    }

    pub fn for_writes(trust_proxy_headers: bool) -> Self {
        Self::with_config(RateLimitConfig::writes(trust_proxy_headers))
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            buckets: self.buckets.clone(),
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    buckets: Arc<Mutex<Buckets>>,
    trust_proxy_headers: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let client_ip = client_ip(&req, self.trust_proxy_headers);

        let allowed = match client_ip {
            Some(ip) => {
                let mut buckets = self.buckets.lock().unwrap_or_else(|poisoned| {
                    warn!("Rate limit state was poisoned, recovering");
                    poisoned.into_inner()
                });
                buckets.allow(ip)
            }
            None => {
                warn!("Could not determine client IP, denying request");
                false
            }
        };

        if !allowed {
            if let Some(ip) = client_ip {
                warn!("Rate limit exceeded for {}", ip);
            }
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, "10")],
                Json(json!({ "error": "rate limit exceeded" })),
            )
                .into_response();
            return Box::pin(async move { Ok(response) });
        }

        Box::pin(self.inner.call(req))
    }
}

/// Client IP from proxy headers (only when trusted), else the socket peer.
fn client_ip<B>(req: &Request<B>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }

        let real_ip = req
            .headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if real_ip.is_some() {
            return real_ip;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny(trust: bool) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_window: 3,
            window_duration: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
            trust_proxy_headers: trust,
        }
    }

    #[test]
    fn test_bucket_exhausts() {
        let config = tiny(false);
        let mut bucket = TokenBucket::full(3);
        for _ in 0..3 {
            assert!(bucket.try_take(&config));
        }
        assert!(!bucket.try_take(&config));
    }

    #[test]
    fn test_clients_are_independent() {
        let mut buckets = Buckets::new(tiny(false));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..3 {
            assert!(buckets.allow(a));
        }
        assert!(!buckets.allow(a));
        assert!(buckets.allow(b));
    }

    #[test]
    fn test_proxy_headers_only_when_trusted() {
        let peer: SocketAddr = "192.168.1.9:4000".parse().unwrap();
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));

        assert_eq!(client_ip(&req, false), Some(peer.ip()));
        assert_eq!(client_ip(&req, true), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_unknown_client() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(client_ip(&req, false), None);
    }
}
