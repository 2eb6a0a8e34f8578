use axum::http::HeaderMap;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const FALLBACK_CLIENT_ADDR: &str = "0.0.0.0";

/// Exact sliding-window limiter keyed by client address.
///
/// Each client keeps the instants of its admitted requests. The prune, count
/// and append for one client run under that client's map entry lock, so
/// concurrent requests cannot overshoot the limit.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Admit and record a request, or reject it without recording.
    pub fn check_and_record(&self, client_id: &str) -> bool {
        self.check_and_record_at(client_id, Instant::now())
    }

    pub fn check_and_record_at(&self, client_id: &str, now: Instant) -> bool {
        let mut timestamps = self.windows.entry(client_id.to_string()).or_default();

        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) < self.window {
                break;
            }
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Drop clients whose newest admission has left the window.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < self.window)
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Identify the caller: `x-real-ip`, then the first `x-forwarded-for` hop,
/// then the socket peer, then a placeholder.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header_value("x-real-ip") {
        return ip.to_string();
    }

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| FALLBACK_CLIENT_ADDR.to_string())
}
