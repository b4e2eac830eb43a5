use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::{broadcast, Mutex};

use crate::response::{AppError, ErrorBody};
use crate::state::AppState;

/// Fixed-window request counter per client IP. Windows align to epoch
/// multiples of `window_secs`, so all clients reset at the same instant.
#[derive(Debug)]
pub struct RateLimitState {
    window_secs: u64,
    max_requests: u64,
    counters: Mutex<HashMap<IpAddr, Counter>>,
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    window: u64,
    hits: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: u64,
}

impl RateLimitState {
    pub fn new(window_secs: u64, max_requests: u64) -> Self {
        Self {
            window_secs: window_secs.max(1),
            max_requests,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `ip` and decide whether it fits the window.
    pub async fn register(&self, ip: IpAddr) -> Decision {
        let window = epoch_secs() / self.window_secs;

        let mut counters = self.counters.lock().await;
        let counter = counters.entry(ip).or_insert(Counter { window, hits: 0 });
        if counter.window != window {
            counter.window = window;
            counter.hits = 0;
        }

        let allowed = counter.hits < self.max_requests;
        if allowed {
            counter.hits += 1;
        }

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(counter.hits),
            reset_at: (window + 1) * self.window_secs,
        }
    }

    /// Drop counters that have been idle for a full window.
    pub async fn sweep(&self) {
        let current = epoch_secs() / self.window_secs;
        let mut counters = self.counters.lock().await;
        counters.retain(|_, counter| counter.window + 1 >= current);
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(req.headers(), state.config().trust_proxy);
    let decision = state.rate_limit().register(ip).await;

    if !decision.allowed {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                success: false,
                code: "RATE_LIMITED".to_string(),
                message: "Too many requests".to_string(),
                trace_id: None,
            }),
        )
            .into_response();

        attach_limit_headers(&mut response, &decision);
        let window = state.config().rate_limit.window_secs;
        if let Ok(value) = window.to_string().parse() {
            response.headers_mut().insert("retry-after", value);
        }
        return Ok(response);
    }

    let mut response = next.run(req).await;
    attach_limit_headers(&mut response, &decision);
    Ok(response)
}

fn attach_limit_headers(response: &mut Response, decision: &Decision) {
    let pairs = [
        ("ratelimit-limit", decision.limit),
        ("ratelimit-remaining", decision.remaining),
        ("ratelimit-reset", decision.reset_at),
    ];
    for (name, value) in pairs {
        if let Ok(value) = value.to_string().parse() {
            response.headers_mut().insert(name, value);
        }
    }
}

/// Behind a trusted proxy the first `x-forwarded-for` hop wins, then
/// `x-real-ip`; direct deployments fall back to loopback.
pub fn client_ip(headers: &HeaderMap, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<IpAddr>().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub async fn rate_limit_cleanup_loop(
    limiter: Arc<RateLimitState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(300));
    loop {
        tokio::select! {
            _ = interval.tick() => limiter.sweep().await,
            _ = shutdown_rx.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_hits_within_a_window() {
        let limiter = RateLimitState::new(3600, 2);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);

        let first = limiter.register(ip).await;
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.register(ip).await.allowed);
        assert!(!limiter.register(ip).await.allowed);
    }

    #[tokio::test]
    async fn ips_are_counted_separately() {
        let limiter = RateLimitState::new(3600, 1);
        assert!(limiter.register("10.0.0.1".parse().unwrap()).await.allowed);
        assert!(limiter.register("10.0.0.2".parse().unwrap()).await.allowed);
        assert!(!limiter.register("10.0.0.1".parse().unwrap()).await.allowed);
    }

    #[tokio::test]
    async fn sweep_keeps_current_counters() {
        let limiter = RateLimitState::new(3600, 5);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        limiter.register(ip).await;
        limiter.sweep().await;
        // the counter is current, so the hit survives the sweep
        assert_eq!(limiter.register(ip).await.remaining, 3);
    }

    #[test]
    fn forwarded_header_needs_proxy_trust() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());

        let trusted = client_ip(&headers, true);
        assert_eq!(trusted, "203.0.113.9".parse::<IpAddr>().unwrap());

        let untrusted = client_ip(&headers, false);
        assert_eq!(untrusted, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        assert_eq!(
            client_ip(&headers, false),
            "198.51.100.4".parse::<IpAddr>().unwrap()
        );
    }
}
