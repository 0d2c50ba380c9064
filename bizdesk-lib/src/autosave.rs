//! Debounced auto-save
//!
//! [`Autosaver`] owns a background task that coalesces bursts of edits into a
//! single write. Each edit replaces the pending value and restarts the timer;
//! the value is written once no edit has arrived for `save_delay`. Writes are
//! issued one at a time in edit order.
//!
//! # Example
//!
//! ```ignore
//! let saver = Autosaver::spawn(AutosaveConfig::default(), move |patch: ScalingPatch| {
//!     let client = client.clone();
//!     async move { client.update::<Product, _>(id, &patch).await.map(|_| ()) }
//! });
//!
//! saver.record(patch_from_form());
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::warn;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::Error;

/// Delay used when none is configured.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(800);

/// Auto-save timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before writing.
    pub save_delay: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}

impl AutosaveConfig {
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }
}

enum Command<T> {
    Edit(T),
    Flush(oneshot::Sender<Result<(), Error>>),
    Shutdown(oneshot::Sender<Result<(), Error>>),
}

#[derive(Debug, Default)]
struct Counters {
    saves: AtomicUsize,
    failures: AtomicUsize,
}

/// Handle to a debounced writer for values of type `T`.
pub struct Autosaver<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    counters: Arc<Counters>,
    task: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Autosaver<T> {
    /// Starts the background task. Must be called inside a tokio runtime.
    pub fn spawn<F, Fut>(config: AutosaveConfig, save: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let task = tokio::spawn(run(config, rx, save, counters.clone()));

        Self {
            tx,
            counters,
            task: Some(task),
        }
    }

    /// Records an edit, replacing any pending value and restarting the timer.
    pub fn record(&self, value: T) {
        if self.tx.send(Command::Edit(value)).is_err() {
            warn!("autosave task has stopped; edit dropped");
        }
    }

    /// Writes the pending value now, if any.
    pub async fn flush(&self) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| Error::InvalidOperation("autosave task has stopped".into()))?;
        rx.await
            .map_err(|_| Error::InvalidOperation("autosave task has stopped".into()))?
    }

    /// Writes the pending value and stops the background task.
    pub async fn shutdown(mut self) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        let sent = self.tx.send(Command::Shutdown(reply)).is_ok();
        let result = if sent {
            rx.await
                .unwrap_or_else(|_| Err(Error::InvalidOperation("autosave task has stopped".into())))
        } else {
            Ok(())
        };
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("autosave task ended abnormally: {}", e);
            }
        }
        result
    }

    /// Number of successful writes.
    pub fn save_count(&self) -> usize {
        self.counters.saves.load(Ordering::Relaxed)
    }

    /// Number of failed writes.
    pub fn failure_count(&self) -> usize {
        self.counters.failures.load(Ordering::Relaxed)
    }
}

async fn run<T, F, Fut>(
    config: AutosaveConfig,
    mut rx: mpsc::UnboundedReceiver<Command<T>>,
    save: F,
    counters: Arc<Counters>,
) where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), Error>>,
{
    let mut pending: Option<T> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Edit(value)) => {
                    pending = Some(value);
                    deadline = Some(Instant::now() + config.save_delay);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = write(&save, pending.take(), &counters).await;
                    let _ = reply.send(result);
                }
                Some(Command::Shutdown(reply)) => {
                    let result = write(&save, pending.take(), &counters).await;
                    let _ = reply.send(result);
                    break;
                }
                None => {
                    // Handle dropped; write what is left.
                    if let Err(e) = write(&save, pending.take(), &counters).await {
                        warn!("final autosave failed: {}", e);
                    }
                    break;
                }
            },
            _ = sleep_until(deadline) => {
                deadline = None;
                if let Err(e) = write(&save, pending.take(), &counters).await {
                    warn!("autosave failed: {}", e);
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn write<T, F, Fut>(save: &F, value: Option<T>, counters: &Counters) -> Result<(), Error>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), Error>>,
{
    let Some(value) = value else {
        return Ok(());
    };
    match save(value).await {
        Ok(()) => {
            counters.saves.fetch_add(1, Ordering::Relaxed);
            debug!("autosave written");
            Ok(())
        }
        Err(e) => {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            Err(e)
        }
    }
}
