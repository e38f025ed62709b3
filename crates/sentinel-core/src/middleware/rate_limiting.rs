use crate::config::LimiterConfig;
use parking_lot::Mutex;
use std::{collections::HashMap, net::IpAddr, sync::Arc};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{Duration, Instant},
};
use tracing::debug;

/// How often the background sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Clients idle for longer than this are evicted by the sweep.
pub const STALE_AFTER: Duration = Duration::from_secs(180);

/// Per-client token bucket rate limiter.
///
/// One bucket per client IP, created with full capacity on first sight. The registry sits
/// behind a single mutex: lookup-or-create, refill, consumption, and the sweep's deletions
/// all happen under the same guard, so a bucket can never be used after it was evicted.
/// The guard is never held across an `.await`.
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<IpAddr, ClientEntry>>>,
    requests_per_second: f64,
    burst: u32,
    enabled: bool,
    sweep_interval: Duration,
    stale_after: Duration,
}

#[derive(Debug, Clone)]
struct ClientEntry {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            requests_per_second,
            burst,
            enabled: true,
            sweep_interval: SWEEP_INTERVAL,
            stale_after: STALE_AFTER,
        }
    }

    #[must_use]
    pub fn from_config(config: &LimiterConfig) -> Self {
        Self::new(config.requests_per_second, config.burst).with_enabled(config.enabled)
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Decides whether `client` may make one more request now.
    ///
    /// Always `true` when the limiter is disabled; the registry is not touched in that case.
    #[must_use]
    pub fn admit(&self, client: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock();
        let entry = clients.entry(client).or_insert_with(|| ClientEntry {
            tokens: f64::from(self.burst),
            last_refill: now,
            last_seen: now,
        });

        Self::take_token(entry, now, self.requests_per_second, self.burst)
    }

    fn take_token(entry: &mut ClientEntry, now: Instant, rate: f64, burst: u32) -> bool {
        entry.last_seen = now;

        let elapsed = now.duration_since(entry.last_refill);
        entry.tokens = (entry.tokens + elapsed.as_secs_f64() * rate).min(f64::from(burst));
        entry.last_refill = now;

        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Removes every client idle for longer than the staleness window.
    ///
    /// Returns the number of evicted clients.
    #[must_use]
    pub fn sweep(&self) -> usize {
        Self::evict_stale(&self.clients, self.stale_after)
    }

    fn evict_stale(clients: &Mutex<HashMap<IpAddr, ClientEntry>>, stale_after: Duration) -> usize {
        let now = Instant::now();
        let mut clients = clients.lock();
        let before_count = clients.len();

        clients.retain(|_, entry| now.duration_since(entry.last_seen) <= stale_after);

        before_count - clients.len()
    }

    /// Spawns the periodic sweep. It stops when `shutdown_rx` fires or its sender is dropped.
    pub fn start_sweeper(&self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let clients = Arc::clone(&self.clients);
        let sweep_interval = self.sweep_interval;
        let stale_after = self.stale_after;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            // first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        debug!("rate limiter sweeper shutting down");
                        break;
                    }

                    _ = interval.tick() => {
                        let evicted = Self::evict_stale(&clients, stale_after);
                        if evicted > 0 {
                            debug!(evicted, "evicted idle rate limit clients");
                        }
                    }
                }
            }
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    #[doc(hidden)]
    #[must_use]
    pub fn tokens_for(&self, client: IpAddr) -> Option<f64> {
        self.clients.lock().get(&client).map(|entry| entry.tokens)
    }
}
