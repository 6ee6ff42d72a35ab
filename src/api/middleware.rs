//! API middleware: per-route-class rate limiting and request logging

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Routes grouped by the upstream RPC work one request costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Quote, tax and cross-chain estimate: each fans out to eth_calls
    ChainRead,
    /// Chain listing and slippage resolution: answered from memory
    Local,
}

impl RouteClass {
    /// `None` for routes that are never limited (health checks)
    pub fn of(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/health" | "/v1/health" => None,
            "/v1/quote" | "/v1/cross/estimate" => Some(Self::ChainRead),
            p if p.starts_with("/v1/tax/") => Some(Self::ChainRead),
            _ => Some(Self::Local),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChainRead => "chain_read",
            Self::Local => "local",
        }
    }
}

/// Per-client budgets for each route class over a shared window
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub chain_read: u32,
    pub local: u32,
    pub window: Duration,
}

impl RateLimits {
    fn budget(&self, class: RouteClass) -> u32 {
        match class {
            RouteClass::ChainRead => self.chain_read,
            RouteClass::Local => self.local,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            // the UI re-quotes on every input change
            chain_read: 120,
            local: 600,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of one limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Fixed-window limiter keyed by (client, route class)
pub struct RateLimiter {
    windows: DashMap<(String, RouteClass), (u32, Instant)>,
    limits: RateLimits,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            windows: DashMap::new(),
            limits,
        }
    }

    pub fn check(&self, client: &str, class: RouteClass) -> RateDecision {
        let now = Instant::now();
        let budget = self.limits.budget(class);
        let mut entry = self
            .windows
            .entry((client.to_string(), class))
            .or_insert((0, now));

        if now.duration_since(entry.1) >= self.limits.window {
            *entry = (0, now);
        }
        let reset_secs = self
            .limits
            .window
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= budget {
            return RateDecision { allowed: false, remaining: 0, reset_secs };
        }
        entry.0 += 1;
        RateDecision {
            allowed: true,
            remaining: budget - entry.0,
            reset_secs,
        }
    }

    /// Drop windows idle for two full periods
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        let keep = self.limits.window * 2;
        self.windows
            .retain(|_, (_, started)| now.duration_since(*started) < keep);
        before - self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

lazy_static::lazy_static! {
    pub static ref RATE_LIMITER: Arc<RateLimiter> = Arc::new(RateLimiter::default());
}

/// Periodically prune the global rate limiter
pub fn start_cleanup_task() {
    tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            let removed = RATE_LIMITER.cleanup();
            if removed > 0 {
                debug!("🧹 Rate limiter cleanup: {} idle windows removed", removed);
            }
        }
    });
}

/// First forwarded address, else one shared bucket for direct callers
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "direct".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(class) = RouteClass::of(request.uri().path()) else {
        return Ok(next.run(request).await);
    };
    let client = client_key(&headers);
    let decision = RATE_LIMITER.check(&client, class);

    if !decision.allowed {
        warn!(client = %client, class = class.as_str(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", decision.remaining.into());
    headers.insert("X-RateLimit-Reset", decision.reset_secs.into());
    Ok(response)
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
