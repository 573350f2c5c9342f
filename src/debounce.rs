use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time;

/// Trailing-edge debounce over a single action.
///
/// Each `schedule` cancels the pending run and starts a new quiet period; the
/// action runs once, with the last scheduled value, when the period elapses.
/// Runs of the same debouncer never overlap. Outside a tokio runtime
/// `schedule` drops the value with a warning.
pub struct Debouncer<T> {
    delay: Duration,
    action: Arc<dyn Fn(T) + Send + Sync>,
    generation: Arc<AtomicU64>,
    run_lock: Arc<Mutex<()>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, action: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            action: Arc::new(action),
            generation: Arc::new(AtomicU64::new(0)),
            run_lock: Arc::new(Mutex::new(())),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, value: T) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::warn!("Debounced run skipped, no tokio runtime: {}", e);
                return;
            }
        };

        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let action = Arc::clone(&self.action);
        let run_lock = Arc::clone(&self.run_lock);
        let delay = self.delay;

        *pending = Some(runtime.spawn(async move {
            time::sleep(delay).await;
            let _running = run_lock.lock();
            // A newer schedule may have landed after this task woke.
            if current.load(Ordering::SeqCst) == generation {
                action(value);
            }
        }));
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
