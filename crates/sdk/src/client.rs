// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The public entry point.
//!
//! [`Outbound`] owns at most one live pipeline. Actions validate their
//! preconditions, consult the config gate, and durably enqueue before
//! returning; delivery happens on the worker task.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use outbound_core::{
    ConfigCache, Event, FilePrefs, IdentifyPayload, IdentityContext, NewRequest, PrefStore,
    QueueStore, RequestId, RequestKind, TokenPayload, TrackPayload, User,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gate::ConfigGate;
use crate::pairing::PairingService;
use crate::transport::{Credentials, Transport};
use crate::worker::{DeliveryEvent, DeliveryObserver, DeliverySettings, DeliveryWorker, WorkerContext};

const QUEUE_FILE: &str = "queue.db";
const PREFS_FILE: &str = "prefs.json";
const EVENT_CAPACITY: usize = 256;

/// Host application context passed to [`Outbound::initialize`].
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Directory holding the queue database and preference file.
    pub data_dir: PathBuf,
    pub platform: String,
    pub app_version: String,
    /// Push token supplied by the host; a stable generated token otherwise.
    pub push_token: Option<String>,
    pub delivery: DeliverySettings,
}

impl AppContext {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        AppContext {
            data_dir: data_dir.into(),
            platform: "rust".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            push_token: None,
            delivery: DeliverySettings::default(),
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_token = Some(token.into());
        self
    }

    pub fn with_delivery(mut self, delivery: DeliverySettings) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_FILE)
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join(PREFS_FILE)
    }
}

/// Everything created by one successful `initialize`.
struct Pipeline {
    queue: Arc<QueueStore>,
    prefs: Arc<dyn PrefStore>,
    identity: Arc<IdentityContext>,
    gate: Arc<ConfigGate>,
    worker: DeliveryWorker,
    pairing: PairingService,
    /// Serializes identity changes with their enqueue.
    actions: Mutex<()>,
}

impl Pipeline {
    fn lock_actions(&self) -> MutexGuard<'_, ()> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, request: NewRequest) -> Result<()> {
        let id = self.queue.append(&request)?;
        self.kick(id, request.kind);
        Ok(())
    }

    /// Hand a committed request to the worker.
    fn kick(&self, id: RequestId, kind: RequestKind) {
        debug!(id = %id, kind = %kind, "request queued");
        self.worker.ensure_started();
        self.worker.wake();
    }

    /// Precondition for track/register: someone must be identified.
    fn require_identity(&self) -> Result<String> {
        self.identity.user_id().ok_or(Error::NoIdentity)
    }

    /// Whether an accepted action should be enqueued.
    fn accepting(&self, kind: RequestKind) -> bool {
        let enabled = self.gate.is_enabled();
        if !enabled {
            debug!(kind = %kind, "delivery disabled, dropping action");
        }
        enabled
    }
}

/// Event-delivery pipeline handle.
///
/// Create one per process and share it; all methods take `&self`.
pub struct Outbound {
    pipeline: RwLock<Option<Arc<Pipeline>>>,
    events: broadcast::Sender<DeliveryEvent>,
    observer: Option<Arc<dyn DeliveryObserver>>,
}

impl Default for Outbound {
    fn default() -> Self {
        Self::new()
    }
}

impl Outbound {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Outbound {
            pipeline: RwLock::new(None),
            events,
            observer: None,
        }
    }

    /// Report dropped requests to `observer`. Applies from the next
    /// `initialize`.
    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn pipeline(&self) -> Result<Arc<Pipeline>> {
        self.pipeline
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Uninitialized)
    }

    fn take_pipeline(&self) -> Option<Arc<Pipeline>> {
        self.pipeline
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Open local state, fetch the remote config, and resume delivery of
    /// anything left queued by a previous run.
    ///
    /// Must be called from within a tokio runtime; the delivery worker runs
    /// on that runtime.
    pub async fn initialize(
        &self,
        app: AppContext,
        api_key: &str,
        client_id: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<()> {
        for (field, value) in [("api key", api_key), ("client id", client_id)] {
            if value.trim().is_empty() {
                return Err(outbound_core::Error::blank(field).into());
            }
        }
        if self.pipeline().is_ok() {
            return Err(Error::AlreadyInitialized);
        }

        fs::create_dir_all(&app.data_dir).map_err(outbound_core::Error::from)?;
        let queue = Arc::new(QueueStore::open(&app.queue_path())?);
        let prefs: Arc<dyn PrefStore> = Arc::new(FilePrefs::open(&app.prefs_path())?);
        let identity = Arc::new(IdentityContext::load(
            Arc::clone(&prefs),
            app.push_token.as_deref(),
        )?);

        let credentials = Credentials::new(api_key, client_id);
        let gate = Arc::new(ConfigGate::new(
            Arc::clone(&transport),
            credentials.clone(),
            ConfigCache::load(Arc::clone(&prefs))?,
            &app.platform,
            &app.app_version,
        ));
        let config = gate.fetch().await;

        let worker = DeliveryWorker::new(
            WorkerContext {
                queue: Arc::clone(&queue),
                identity: Arc::clone(&identity),
                gate: Arc::clone(&gate),
                transport: Arc::clone(&transport),
                credentials: credentials.clone(),
                settings: app.delivery,
                events: self.events.clone(),
                observer: self.observer.clone(),
            },
            Handle::current(),
        );
        let pairing = PairingService::new(
            transport,
            credentials,
            Arc::clone(&identity),
            Arc::clone(&gate),
        );

        let pipeline = Arc::new(Pipeline {
            queue,
            prefs,
            identity,
            gate,
            worker,
            pairing,
            actions: Mutex::new(()),
        });

        {
            let mut slot = self.pipeline.write().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            *slot = Some(Arc::clone(&pipeline));
        }

        let pending = pipeline.queue.len()?;
        if config.enabled && pending > 0 {
            info!(pending, "resuming delivery");
            pipeline.worker.ensure_started();
        }
        info!(
            enabled = config.enabled,
            data_dir = %app.data_dir.display(),
            "outbound initialized"
        );
        Ok(())
    }

    /// Identify the current user and queue an identify request.
    ///
    /// The identity is updated even while delivery is disabled, so later
    /// actions see the same preconditions either way.
    pub fn identify(&self, user: &User) -> Result<()> {
        let pipeline = self.pipeline()?;
        user.validate()?;

        let _guard = pipeline.lock_actions();
        if !pipeline.accepting(RequestKind::Identify) {
            pipeline.identity.set_identity(&user.id)?;
            return Ok(());
        }

        let request = NewRequest::new(RequestKind::Identify, &IdentifyPayload::from(user))?;
        let id = pipeline.queue.append(&request)?;
        if let Err(e) = pipeline.identity.set_identity(&user.id) {
            // The worker has not been woken for this row yet.
            if let Err(remove_err) = pipeline.queue.remove(id) {
                warn!(id = %id, error = %remove_err, "failed to withdraw identify request");
            }
            return Err(e.into());
        }
        pipeline.kick(id, RequestKind::Identify);
        Ok(())
    }

    /// Queue an event for the identified user.
    pub fn track(&self, event: &Event) -> Result<()> {
        let pipeline = self.pipeline()?;
        event.validate()?;

        let _guard = pipeline.lock_actions();
        let user_id = pipeline.require_identity()?;
        if !pipeline.accepting(RequestKind::Track) {
            return Ok(());
        }
        let payload = TrackPayload {
            user_id,
            event: event.clone(),
        };
        pipeline.enqueue(NewRequest::new(RequestKind::Track, &payload)?)
    }

    /// Register this device's push token for the identified user.
    pub fn register(&self) -> Result<()> {
        let pipeline = self.pipeline()?;

        let _guard = pipeline.lock_actions();
        let user_id = pipeline.require_identity()?;
        if !pipeline.accepting(RequestKind::Register) {
            return Ok(());
        }
        let payload = TokenPayload {
            user_id,
            token: pipeline.identity.device_token(),
        };
        pipeline.enqueue(NewRequest::new(RequestKind::Register, &payload)?)
    }

    /// Disable push for the identified user. Does nothing if nobody is
    /// identified.
    pub fn disable(&self) -> Result<()> {
        let pipeline = self.pipeline()?;

        let _guard = pipeline.lock_actions();
        let Some(user_id) = pipeline.identity.user_id() else {
            debug!("disable without identity ignored");
            return Ok(());
        };
        if !pipeline.accepting(RequestKind::Disable) {
            return Ok(());
        }
        let payload = TokenPayload {
            user_id,
            token: pipeline.identity.device_token(),
        };
        pipeline.enqueue(NewRequest::new(RequestKind::Disable, &payload)?)
    }

    /// The active push token, or `""`. Never fails.
    pub fn active_token(&self) -> String {
        self.pipeline()
            .map(|p| p.identity.current_token())
            .unwrap_or_default()
    }

    /// Pair this device using a PIN shown by the dashboard.
    pub async fn pair_device(&self, pin: &str) -> Result<bool> {
        let pipeline = self.pipeline()?;
        pipeline.pairing.pair_device(pin).await
    }

    pub fn is_enabled(&self) -> bool {
        self.pipeline().is_ok_and(|p| p.gate.is_enabled())
    }

    pub fn current_user(&self) -> Result<Option<String>> {
        Ok(self.pipeline()?.identity.user_id())
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.pipeline()?.queue.len()?)
    }

    /// Subscribe to delivery events. Survives shutdown and re-initialization.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    /// Wait until the queue is drained or `timeout` elapses.
    ///
    /// Returns whether the queue is empty. With delivery disabled nothing is
    /// sent, so this returns immediately.
    pub async fn flush(&self, timeout: Duration) -> Result<bool> {
        let pipeline = self.pipeline()?;
        let mut events = self.events.subscribe();

        if pipeline.queue.is_empty()? {
            return Ok(true);
        }
        if !pipeline.gate.is_enabled() {
            return Ok(false);
        }
        pipeline.worker.ensure_started();
        pipeline.worker.wake();

        match tokio::time::timeout(timeout, wait_for_drain(&pipeline, &mut events)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("flush timed out");
                Ok(false)
            }
        }
    }

    /// Stop the worker and release the pipeline. Queued requests stay on
    /// disk; `initialize` may be called again.
    pub async fn shutdown(&self) {
        if let Some(pipeline) = self.take_pipeline() {
            pipeline.worker.shutdown().await;
            info!("outbound shut down");
        }
    }

    /// Shut down and erase all local state: queue, identity and cached config.
    pub async fn reset(&self) -> Result<()> {
        let pipeline = self.take_pipeline().ok_or(Error::Uninitialized)?;
        pipeline.worker.shutdown().await;
        pipeline.queue.clear_all()?;
        pipeline.prefs.clear()?;
        info!("outbound reset");
        Ok(())
    }
}

/// Wait for an idle notification observed with an empty queue.
async fn wait_for_drain(
    pipeline: &Pipeline,
    events: &mut broadcast::Receiver<DeliveryEvent>,
) -> Result<bool> {
    loop {
        match events.recv().await {
            Ok(DeliveryEvent::Idle) | Err(RecvError::Lagged(_)) => {
                if pipeline.queue.is_empty()? {
                    return Ok(true);
                }
            }
            Ok(_) => {}
            Err(RecvError::Closed) => return Ok(pipeline.queue.is_empty()?),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
