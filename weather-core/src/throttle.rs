use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// Pause taken between two fetch windows to stay inside the provider's
/// per-minute allowance.
#[async_trait]
pub trait Throttle: Send + Sync + Debug {
    async fn wait(&self);
}

/// Sleeps for a fixed interval.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Throttle for FixedInterval {
    async fn wait(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Never waits; only counts how often a wait was requested.
#[derive(Debug, Default)]
pub struct NoDelay {
    waits: AtomicUsize,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for NoDelay {
    async fn wait(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}
