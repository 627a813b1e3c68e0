//! Generation worker thread
//!
//! The [`Composer`] lives on a dedicated thread running a current-thread
//! tokio runtime. The UI sends [`Command`]s and reads snapshots; it never
//! waits on the network.
//!
//! ```text
//! UI Thread                        Worker Thread
//!     │                                 │
//! [Click]──────(Command)─────────────►[Composer]──►[Text service]
//!     │                                 │   ▲            │
//! [Render]◄─────(snapshot)────────────[watch]  └──(response)
//! ```
//!
//! At most one request is in flight; commands keep flowing while it runs.
//! A `Generate` queued before the response arrives is refused as busy.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, mpsc as std_mpsc};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use cadenza_core::{
    AudioBackend, Composer, ComposerSnapshot, CompositionTextService, Field, GenerationError,
    PendingGeneration,
};

use crate::app::AppError;

/// Requests from the UI to the worker
#[derive(Debug)]
pub enum Command {
    /// Set one selection field
    SetField(Field, String),
    /// Validate and start a generation
    Generate,
    /// Flip play/pause
    TogglePlaying,
    /// Set the volume (clamped to 0-100)
    SetVolume(i32),
    /// Clear the pending user notice
    DismissNotice,
    /// Stop the worker; acknowledged once the audio sink is released
    Shutdown(oneshot::Sender<()>),
}

type RequestFuture = Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send>>;

/// Handle to the generation worker
///
/// Dropping the handle closes the command channel and joins the thread.
pub struct ComposerHandle {
    /// Command sender (Option to allow explicit drop before join)
    tx: Option<mpsc::UnboundedSender<Command>>,
    /// Latest composer state
    snapshots: watch::Receiver<ComposerSnapshot>,
    /// Thread join handle
    handle: Option<JoinHandle<()>>,
}

impl ComposerHandle {
    /// Spawns the worker.
    ///
    /// The composer is created on the worker thread, so sinks opened by
    /// `backend` never leave it. `on_change` runs on the worker after every
    /// handled event (the UI uses it to request a repaint).
    pub fn spawn<B, S, F>(
        backend: B,
        service: S,
        initial_volume: u8,
        on_change: F,
    ) -> Result<Self, AppError>
    where
        B: AudioBackend + Send + 'static,
        S: CompositionTextService + Send + Sync + 'static,
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("composer".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let composer = Composer::new(backend, initial_volume);
                if ready_tx.send(Ok(composer.subscribe())).is_err() {
                    return;
                }

                rt.block_on(run(composer, Arc::new(service), rx, on_change));
            })
            .map_err(|e| AppError::Worker(format!("Failed to spawn thread: {}", e)))?;

        let snapshots = match ready_rx.recv() {
            Ok(Ok(snapshots)) => snapshots,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(AppError::Worker(format!("Failed to create runtime: {}", e)));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(AppError::Worker("Worker exited during startup".to_string()));
            }
        };

        Ok(Self {
            tx: Some(tx),
            snapshots,
            handle: Some(handle),
        })
    }

    /// Queues a command. Returns false if the worker is gone.
    pub fn send(&self, command: Command) -> bool {
        let Some(ref tx) = self.tx else {
            warn!("Worker sender already dropped");
            return false;
        };
        if tx.send(command).is_err() {
            warn!("Worker disconnected");
            return false;
        }
        true
    }

    /// Clone of the latest snapshot.
    pub fn snapshot(&self) -> ComposerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver for snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<ComposerSnapshot> {
        self.snapshots.clone()
    }

    /// Check if the worker thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stops the worker and waits until the audio sink is released.
    ///
    /// Must not be called from inside an async runtime.
    pub fn shutdown(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.send(Command::Shutdown(ack_tx)) && ack_rx.blocking_recv().is_err() {
            warn!("Worker exited without acknowledging shutdown");
        }
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ComposerHandle {
    fn drop(&mut self) {
        // Drop the sender first so the worker's recv() returns None
        drop(self.tx.take());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Awaits the in-flight request, or never resolves if there is none.
async fn next_response(request: &mut Option<RequestFuture>) -> Result<String, GenerationError> {
    match request {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn run<B, S, F>(
    mut composer: Composer<B>,
    service: Arc<S>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    on_change: F,
) where
    B: AudioBackend,
    S: CompositionTextService + Send + Sync + 'static,
    F: Fn(),
{
    let mut pending: Option<PendingGeneration> = None;
    let mut request: Option<RequestFuture> = None;
    let mut shutdown_ack = None;

    debug!("Composer worker started");

    loop {
        tokio::select! {
            // Queued commands are handled before a response is applied
            biased;

            command = rx.recv() => {
                let Some(command) = command else {
                    debug!("Command channel closed");
                    break;
                };
                match command {
                    Command::Shutdown(ack) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    Command::Generate => {
                        if let Ok(ticket) = composer.begin_generation() {
                            let service = Arc::clone(&service);
                            let selection = ticket.selection().clone();
                            request = Some(Box::pin(async move {
                                service.compose(&selection).await
                            }));
                            pending = Some(ticket);
                        }
                    }
                    Command::SetField(field, value) => composer.update_field(field, value),
                    Command::TogglePlaying => composer.toggle_playing(),
                    Command::SetVolume(volume) => {
                        composer.set_volume(volume);
                    }
                    Command::DismissNotice => composer.dismiss_notice(),
                }
            }
            result = next_response(&mut request), if request.is_some() => {
                request = None;
                if let Some(ticket) = pending.take() {
                    // Failures are logged by the composer
                    let _ = composer.finish_generation(ticket, result);
                }
            }
        }
        on_change();
    }

    if request.take().is_some() {
        info!("Discarding in-flight generation request");
    }
    drop(pending);
    drop(composer);
    on_change();

    if let Some(ack) = shutdown_ack {
        let _ = ack.send(());
    }
    debug!("Composer worker stopped");
}

#[cfg(test)]
mod tests;
