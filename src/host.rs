//! Delegating `wait` to the environment the driver runs in.
//!
//! When embedded in a durable workflow host, blocking on a condition should
//! go through the host's own cooperative wait primitive rather than busy
//! polling the bindings from inside this crate. `HostWaiter` is the seam:
//! the default, [`LocalWaiter`], polls on a fixed cadence and is what a
//! caller gets when no host is present.
//!
//! The predicate itself is not known to this module — the driver closes
//! over the concrete `Predicate`/`CodeEvaluator` pair and hands `wait` a
//! plain async-evaluation callback, keeping this trait free of any
//! dependency on the program model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

/// Abstracts "block until this check reports true, or the timeout elapses."
#[async_trait]
pub trait HostWaiter: Send + Sync {
    /// `check` re-evaluates the guarded condition each time it is polled;
    /// it is expected to read live bindings itself. Returns `true` if the
    /// condition became true before the timeout, `false` on timeout.
    /// `timeout` of `None` means wait indefinitely.
    async fn wait(
        &self,
        timeout: Option<Duration>,
        check: &(dyn Fn() -> BoxFuture<'static, bool> + Send + Sync),
    ) -> bool;
}

/// Polls the check at a fixed cadence. Used whenever no host-supplied
/// waiter is configured.
pub struct LocalWaiter {
    poll_interval: Duration,
}

impl LocalWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for LocalWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl HostWaiter for LocalWaiter {
    async fn wait(
        &self,
        timeout: Option<Duration>,
        check: &(dyn Fn() -> BoxFuture<'static, bool> + Send + Sync),
    ) -> bool {
        let poll = async {
            let mut interval = tokio::time::interval(self.poll_interval);
            loop {
                if check().await {
                    return true;
                }
                interval.tick().await;
            }
        };

        match timeout {
            Some(duration) => tokio::time::timeout(duration, poll).await.unwrap_or(false),
            None => poll.await,
        }
    }
}

/// Convenience constructor for a shared default waiter.
pub fn local_waiter() -> Arc<dyn HostWaiter> {
    Arc::new(LocalWaiter::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn resolves_once_check_turns_true() {
        let waiter = LocalWaiter::new(Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let check = move || {
            let c = c.clone();
            Box::pin(async move { c.fetch_add(1, Ordering::SeqCst) >= 3 }) as BoxFuture<'static, bool>
        };
        let ok = waiter.wait(Some(Duration::from_secs(5)), &check).await;
        assert!(ok);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_true() {
        let waiter = LocalWaiter::new(Duration::from_millis(10));
        let check = || Box::pin(async { false }) as BoxFuture<'static, bool>;
        let ok = waiter.wait(Some(Duration::from_millis(50)), &check).await;
        assert!(!ok);
    }
}
