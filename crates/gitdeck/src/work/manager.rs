use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use backon::BackoffBuilder;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::outcome::CallOutcome;
use super::policy::RetryPolicy;

struct WorkEntry {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    entries: HashMap<String, WorkEntry>,
}

/// How a task ended, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskEnd {
    Succeeded,
    Failed,
    Exhausted,
    Cancelled,
}

/// Registry of keyed retry tasks.
///
/// Cheap to clone; clones share the registry. Every task removes its own
/// entry when it ends, unless it has already been replaced. The active count
/// is published while the registry lock is held so it never goes stale.
#[derive(Clone)]
pub struct BackoffWorkManager {
    registry: Arc<Mutex<Registry>>,
    active: watch::Sender<usize>,
}

impl Default for BackoffWorkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffWorkManager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            active: watch::Sender::new(0),
        }
    }

    /// Run `operation` under `key`, retrying transient failures per `policy`.
    ///
    /// Any task already running under `key` is cancelled first. The first
    /// attempt starts immediately.
    pub fn add_work<F, Fut, E>(&self, key: impl Into<String>, policy: RetryPolicy, operation: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = CallOutcome<E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.spawn(key.into(), policy, false, operation);
    }

    /// Like [`add_work`](Self::add_work), but waits one backoff delay before
    /// the first attempt. Used when the caller has just seen a transient
    /// failure itself.
    pub fn add_retry<F, Fut, E>(&self, key: impl Into<String>, policy: RetryPolicy, operation: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = CallOutcome<E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.spawn(key.into(), policy, true, operation);
    }

    fn spawn<F, Fut, E>(&self, key: String, policy: RetryPolicy, delay_first: bool, operation: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = CallOutcome<E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let token = CancellationToken::new();

        // Spawn while holding the lock so the task cannot remove its entry
        // before it has been inserted.
        let mut registry = self.lock();
        registry.next_generation += 1;
        let generation = registry.next_generation;

        let task_key = key.clone();
        let task_token = token.clone();
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let end = run_with_backoff(&task_key, policy, delay_first, &task_token, operation).await;
            tracing::debug!(key = %task_key, ?end, "Work finished");
            manager.remove_if_current(&task_key, generation);
        });

        if let Some(previous) = registry.entries.insert(
            key.clone(),
            WorkEntry {
                generation,
                token,
                handle,
            },
        ) {
            tracing::debug!(key = %key, "Replacing pending work");
            previous.token.cancel();
        }
        self.active.send_replace(registry.entries.len());
    }

    /// Cancel the task registered under `key`, if any.
    pub fn cancel(&self, key: &str) -> bool {
        let mut registry = self.lock();
        let removed = registry.entries.remove(key);
        self.active.send_replace(registry.entries.len());
        drop(registry);
        match removed {
            Some(entry) => {
                tracing::debug!(key, "Cancelled pending work");
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every task and forget it. Used on logout.
    pub fn clear_work(&self) {
        let drained = self.drain();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Cleared pending work");
        }
        for entry in drained {
            entry.token.cancel();
        }
    }

    /// Cancel every task and wait for all of them to end.
    pub async fn shutdown(&self) {
        let drained = self.drain();
        for entry in &drained {
            entry.token.cancel();
        }
        for entry in drained {
            if let Err(e) = entry.handle.await {
                tracing::warn!(error = %e, "Work task did not shut down cleanly");
            }
        }
    }

    /// Resolve once no task is registered.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        // The sender lives in `self`, so this only errors if it was dropped.
        let _ = rx.wait_for(|active| *active == 0).await;
    }

    /// Whether a task is registered under `key`.
    pub fn is_active(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Keys of all registered tasks, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(&self) -> Vec<WorkEntry> {
        let mut registry = self.lock();
        let drained: Vec<WorkEntry> = registry.entries.drain().map(|(_, e)| e).collect();
        self.active.send_replace(0);
        drained
    }

    fn remove_if_current(&self, key: &str, generation: u64) {
        let mut registry = self.lock();
        if registry
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            registry.entries.remove(key);
        }
        self.active.send_replace(registry.entries.len());
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_with_backoff<F, Fut, E>(
    key: &str,
    policy: RetryPolicy,
    delay_first: bool,
    token: &CancellationToken,
    mut operation: F,
) -> TaskEnd
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CallOutcome<E>>,
    E: Display,
{
    let mut delays = policy.into_backoff().build();

    if delay_first {
        let delay = delays.next().unwrap_or(policy.initial_delay);
        if !sleep_unless_cancelled(token, delay).await {
            return TaskEnd::Cancelled;
        }
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return TaskEnd::Cancelled,
            outcome = operation() => outcome,
        };

        match outcome {
            CallOutcome::Success => return TaskEnd::Succeeded,
            CallOutcome::Permanent(e) => {
                tracing::debug!(key, attempt, error = %e, "Work failed permanently");
                return TaskEnd::Failed;
            }
            CallOutcome::Transient(e) => {
                let next_delay = if attempt < policy.max_attempts {
                    delays.next()
                } else {
                    None
                };
                let Some(delay) = next_delay else {
                    tracing::warn!(key, attempts = attempt, error = %e, "Retries exhausted");
                    return TaskEnd::Exhausted;
                };
                tracing::debug!(
                    key,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retry scheduled"
                );
                if !sleep_unless_cancelled(token, delay).await {
                    return TaskEnd::Cancelled;
                }
            }
        }
    }
}

/// Returns `false` if cancelled before the delay elapsed.
async fn sleep_unless_cancelled(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1_000),
            Duration::from_secs(60),
            2.0,
        )
    }

    /// Fails transiently `failures` times, then succeeds.
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = CallOutcome<String>> + Send>>
    + Send
    + 'static {
        move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    CallOutcome::Transient(format!("attempt {n} unreachable"))
                } else {
                    CallOutcome::Success
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let calls = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();
        let started = Instant::now();

        work.add_work("star_1", policy(5), flaky(Arc::clone(&calls), 3));
        work.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(7_000));
        assert!(!work.is_active("star_1"));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_never_exceed_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        work.add_work("star_1", policy(3), flaky(Arc::clone(&calls), u32::MAX));
        work.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(work.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_stops_at_that_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        let counter = Arc::clone(&calls);
        work.add_work("star_1", policy(5), move || {
            let counter = Arc::clone(&counter);
            async move {
                match counter.fetch_add(1, Ordering::SeqCst) + 1 {
                    1 | 2 => CallOutcome::Transient("unreachable"),
                    _ => CallOutcome::Permanent("not found"),
                }
            }
        });
        work.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_work_stops_the_first_task() {
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        work.add_work("star_1", policy(5), flaky(Arc::clone(&first), u32::MAX));
        // Let the first task make its first attempt and start waiting.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(first.load(Ordering::SeqCst), 1);

        work.add_work("star_1", policy(5), flaky(Arc::clone(&second), 1));
        assert_eq!(work.len(), 1);
        work.wait_idle().await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn add_retry_waits_before_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();
        let started = Instant::now();

        work.add_retry("star_1", policy(5), flaky(Arc::clone(&calls), 0));
        work.wait_idle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_work_cancels_everything() {
        let a = Arc::new(AtomicU32::new(0));
        let b = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        work.add_work("star_1", policy(5), flaky(Arc::clone(&a), u32::MAX));
        work.add_work("star_2", policy(5), flaky(Arc::clone(&b), u32::MAX));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(work.active_keys(), ["star_1", "star_2"]);

        work.clear_work();
        assert!(work.is_empty());
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_removes_only_that_key() {
        let a = Arc::new(AtomicU32::new(0));
        let b = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        work.add_retry("star_1", policy(5), flaky(Arc::clone(&a), 0));
        work.add_retry("star_2", policy(5), flaky(Arc::clone(&b), 0));
        assert!(work.cancel("star_1"));
        assert!(!work.cancel("star_1"));
        work.wait_idle().await;

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_joins_cancelled_tasks() {
        let calls = Arc::new(AtomicU32::new(0));
        let work = BackoffWorkManager::new();

        work.add_retry("star_1", policy(5), flaky(Arc::clone(&calls), 0));
        work.shutdown().await;

        assert!(work.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
