//! Async driver for the engine
//!
//! [`FlowKeys`] is the instance applications hold. It shares one [`Engine`]
//! between the caller (for registration) and any number of listener tasks,
//! each consuming one injected input source.
//!
//! # Listener Loop
//!
//! Each listener waits on three things at once:
//!
//! 1. the shutdown signal sent by [`FlowKeys::destroy`]
//! 2. the next event from its source
//! 3. the engine's pending debounce deadline, if any
//!
//! Events are handled one at a time with the engine locked, so matched
//! callbacks run synchronously inside the event-handling path. The deadline is
//! read again on every iteration, so a new press that moves it effectively
//! cancels and restarts the timer.
//!
//! # Example
//!
//! ```no_run
//! use flowkeys::{channel, FlowKeys, FinalizePolicy, Step};
//!
//! # async fn example() {
//! let mut keys = FlowKeys::new(FinalizePolicy::ReleaseEdge);
//! keys.register(&[Step::combo(["control", "k"])], || println!("palette"))
//!     .await;
//!
//! let (sender, source) = channel();
//! keys.attach(source);
//!
//! sender.press("Control");
//! sender.press("k");
//! sender.release("k");
//! sender.release("Control");
//!
//! keys.destroy().await;
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::buffer::FinalizePolicy;
use crate::combo::Step;
use crate::engine::{Engine, Settings};
use crate::event::{KeyEvent, KeyEventKind};

/// An engine shared between the owning instance and its listener tasks.
pub type SharedEngine = Arc<Mutex<Engine>>;

/// A running subscription to one input source.
struct Listener {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A shortcut recognizer attached to zero or more input sources.
pub struct FlowKeys {
    engine: SharedEngine,
    listeners: Vec<Listener>,
}

impl FlowKeys {
    pub fn new(policy: FinalizePolicy) -> Self {
        Self {
            engine: Arc::new(Mutex::new(Engine::new(policy))),
            listeners: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.policy)
    }

    /// The shared engine, for inspection.
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Make `alternates` collapse onto `canonical`.
    pub async fn add_alias<I, S>(&self, canonical: &str, alternates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.engine.lock().await.add_alias(canonical, alternates);
    }

    /// Register `callback` for `sequence`. Empty sequences are ignored.
    pub async fn register<F>(&self, sequence: &[Step], callback: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.engine.lock().await.register(sequence, callback)
    }

    /// Start consuming `source` on a new tokio task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<S>(&mut self, source: S)
    where
        S: Stream<Item = KeyEvent> + Send + Unpin + 'static,
    {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_listener(Arc::clone(&self.engine), source, shutdown_rx));

        self.listeners.push(Listener { shutdown, handle });
        tracing::info!("Attached input source ({} active)", self.listeners.len());
    }

    /// Number of attached input sources still being listened to.
    ///
    /// A listener stops early when its source closes or a callback panics;
    /// see [`prune`](Self::prune).
    pub fn listener_count(&self) -> usize {
        self.listeners
            .iter()
            .filter(|listener| !listener.handle.is_finished())
            .count()
    }

    /// Drop listeners whose task has already ended, logging any that ended
    /// abnormally. Returns how many were dropped.
    pub async fn prune(&mut self) -> usize {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .listeners
            .drain(..)
            .partition(|listener| listener.handle.is_finished());
        self.listeners = running;

        let count = finished.len();
        for listener in finished {
            if let Err(e) = listener.handle.await {
                tracing::warn!("Listener task ended abnormally: {}", e);
            }
        }
        count
    }

    /// Detach every input source, cancel any pending debounce task and reset
    /// all state.
    ///
    /// Every listener task has finished by the time this returns, so no
    /// callback can fire afterwards.
    pub async fn destroy(&mut self) {
        for listener in self.listeners.drain(..) {
            // The task may already have ended on its own (source closed).
            let _ = listener.shutdown.send(());
            if let Err(e) = listener.handle.await {
                tracing::warn!("Listener task ended abnormally: {}", e);
            }
        }

        self.engine.lock().await.reset();
        tracing::info!("Destroyed");
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn run_listener<S>(engine: SharedEngine, mut source: S, mut shutdown: oneshot::Receiver<()>)
where
    S: Stream<Item = KeyEvent> + Send + Unpin,
{
    // Keys this source has down, so they can be let go if it goes away
    let mut held = BTreeSet::new();

    loop {
        let deadline = engine.lock().await.next_deadline();
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => futures::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            _ = &mut shutdown => break,
            event = source.next() => match event {
                Some(event) => {
                    let mut locked = engine.lock().await;
                    let key = locked.normalize_key(&event.key);
                    match event.kind {
                        KeyEventKind::Press => held.insert(key),
                        KeyEventKind::Release => held.remove(&key),
                    };
                    locked.handle(&event, now());
                }
                None => {
                    tracing::debug!("Input source closed");
                    drain_pending(&engine, &mut shutdown).await;
                    break;
                }
            },
            _ = timer => {
                engine.lock().await.poll(now());
            }
        }
    }

    if !held.is_empty() {
        engine.lock().await.release_all(&held);
    }
}

/// Let a pending debounce task finish before a closed source's listener exits,
/// so the last burst is not lost.
async fn drain_pending(engine: &SharedEngine, shutdown: &mut oneshot::Receiver<()>) {
    let Some(at) = engine.lock().await.next_deadline() else {
        return;
    };

    tokio::select! {
        biased;

        _ = shutdown => {}
        _ = tokio::time::sleep_until(tokio::time::Instant::from_std(at)) => {
            engine.lock().await.poll(now());
        }
    }
}

/// Sending half of an in-process input source.
///
/// Sends fail (return `false`) once the receiving listener has stopped.
#[derive(Debug, Clone)]
pub struct KeySender {
    tx: mpsc::UnboundedSender<KeyEvent>,
}

impl KeySender {
    pub fn send(&self, event: KeyEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn press(&self, key: impl Into<String>) -> bool {
        self.send(KeyEvent::press(key))
    }

    pub fn release(&self, key: impl Into<String>) -> bool {
        self.send(KeyEvent::release(key))
    }
}

/// Create an in-process input source.
pub fn channel() -> (KeySender, UnboundedReceiverStream<KeyEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (KeySender { tx }, UnboundedReceiverStream::new(rx))
}
