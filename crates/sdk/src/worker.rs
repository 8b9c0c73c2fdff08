// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background delivery of queued requests.
//!
//! One worker task per pipeline drains the queue store oldest-first, one
//! request at a time:
//!
//! ```text
//! Pending ──send──► Delivered            (removed)
//!    ▲        ├───► Failed               (attempt+1, backoff, retry)
//!    └────────┘└──► PermanentlyFailed    (removed, reported)
//! ```
//!
//! A request only leaves the store after the server acknowledged it or it
//! was given up on, so a crash or shutdown at any point leaves it queued for
//! the next run.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use outbound_core::{
    IdentityContext, PendingRequest, QueueStore, RequestId, RequestKind, TokenPayload,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DeliveryError;
use crate::gate::ConfigGate;
use crate::transport::{ApiRequest, Credentials, Endpoint, Transport, TransportError};

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    60_000
}

/// Retry policy for queued requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// Failed attempts after which a request is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl DeliverySettings {
    /// Delay before retrying after the `attempt`-th failure:
    /// `min(initial * 2^(attempt-1), max)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Progress notifications from the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    Delivered {
        id: RequestId,
        kind: RequestKind,
    },
    Retrying {
        id: RequestId,
        kind: RequestKind,
        attempt: u32,
        delay: Duration,
    },
    Dropped {
        id: RequestId,
        kind: RequestKind,
        error: DeliveryError,
    },
    /// The worker found nothing to send.
    Idle,
}

/// Receives requests the worker gave up on.
pub trait DeliveryObserver: Send + Sync {
    fn on_dropped(&self, request: &PendingRequest, error: &DeliveryError);
}

/// Map an HTTP status to a delivery outcome.
///
/// Auth failures are retried: credentials may be fixed server-side while the
/// request waits.
pub fn classify_status(status: u16) -> Result<(), DeliveryError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 | 500..=599 => Err(DeliveryError::Transient(format!("HTTP {status}"))),
        _ => Err(DeliveryError::Permanent(format!("HTTP {status}"))),
    }
}

pub fn classify_transport_error(err: &TransportError) -> DeliveryError {
    match err {
        TransportError::Serialization(_) => DeliveryError::Permanent(err.to_string()),
        TransportError::Timeout
        | TransportError::ConnectionFailed(_)
        | TransportError::RequestFailed(_) => DeliveryError::Transient(err.to_string()),
    }
}

/// Everything the worker task needs, shared with its owner.
pub(crate) struct WorkerContext {
    pub queue: Arc<QueueStore>,
    pub identity: Arc<IdentityContext>,
    pub gate: Arc<ConfigGate>,
    pub transport: Arc<dyn Transport>,
    pub credentials: Credentials,
    pub settings: DeliverySettings,
    pub events: broadcast::Sender<DeliveryEvent>,
    pub observer: Option<Arc<dyn DeliveryObserver>>,
}

struct Shared {
    ctx: WorkerContext,
    wake: Notify,
}

/// Owner of the background delivery task.
pub struct DeliveryWorker {
    shared: Arc<Shared>,
    runtime: Handle,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryWorker {
    /// Create a stopped worker whose task will run on `runtime`.
    pub(crate) fn new(ctx: WorkerContext, runtime: Handle) -> Self {
        DeliveryWorker {
            shared: Arc::new(Shared {
                ctx,
                wake: Notify::new(),
            }),
            runtime,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Start the task if it is not running yet. No-op after shutdown.
    pub fn ensure_started(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() || self.cancel.is_cancelled() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        *task = Some(self.runtime.spawn(run(shared, cancel)));
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Signal that the queue changed.
    pub fn wake(&self) {
        self.shared.wake.notify_one();
    }

    /// Stop the task and wait for it to exit.
    ///
    /// A request being sent or waiting out its backoff stays queued.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "delivery worker ended abnormally");
            }
        }
    }
}

/// Whether the loop should keep going after handling a request.
enum Flow {
    Continue,
    Stop,
}

async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    info!("delivery worker started");
    let ctx = &shared.ctx;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = if ctx.gate.is_enabled() {
            ctx.queue.peek_oldest()
        } else {
            debug!("delivery disabled, worker idle");
            Ok(None)
        };

        let flow = match next {
            Ok(Some(request)) => deliver(ctx, request, &cancel).await,
            Ok(None) => {
                let _ = ctx.events.send(DeliveryEvent::Idle);
                tokio::select! {
                    _ = cancel.cancelled() => Flow::Stop,
                    _ = shared.wake.notified() => Flow::Continue,
                }
            }
            Err(e) => {
                error!(error = %e, "failed to read queue");
                pause(ctx.settings.backoff(1), &cancel).await
            }
        };

        if let Flow::Stop = flow {
            break;
        }
    }

    info!("delivery worker stopped");
}

async fn pause(delay: Duration, cancel: &CancellationToken) -> Flow {
    tokio::select! {
        _ = cancel.cancelled() => Flow::Stop,
        _ = tokio::time::sleep(delay) => Flow::Continue,
    }
}

async fn deliver(ctx: &WorkerContext, request: PendingRequest, cancel: &CancellationToken) -> Flow {
    debug!(id = %request.id, kind = %request.kind, attempt = request.attempt, "sending request");

    let outcome = tokio::select! {
        _ = cancel.cancelled() => return Flow::Stop,
        outcome = send(ctx, &request) => outcome,
    };

    let result = match outcome {
        Ok(()) => complete(ctx, &request),
        Err(DeliveryError::Transient(reason)) => return retry(ctx, &request, reason, cancel).await,
        Err(err) => give_up(ctx, &request, err),
    };

    match result {
        Ok(()) => Flow::Continue,
        Err(e) => {
            error!(id = %request.id, error = %e, "failed to update queue");
            pause(ctx.settings.backoff(1), cancel).await
        }
    }
}

async fn send(ctx: &WorkerContext, request: &PendingRequest) -> Result<(), DeliveryError> {
    let body = request
        .body()
        .map_err(|e| DeliveryError::Permanent(format!("unreadable payload: {e}")))?;
    let api_request = ApiRequest::post(Endpoint::for_kind(request.kind), body)
        .with_credentials(&ctx.credentials);

    match ctx.transport.send(api_request).await {
        Ok(response) => classify_status(response.status),
        Err(e) => Err(classify_transport_error(&e)),
    }
}

/// Side effects apply only after the request has left the queue.
fn complete(ctx: &WorkerContext, request: &PendingRequest) -> outbound_core::Result<()> {
    ctx.queue.remove(request.id)?;
    apply_side_effects(ctx, request);
    info!(id = %request.id, kind = %request.kind, "request delivered");
    let _ = ctx.events.send(DeliveryEvent::Delivered {
        id: request.id,
        kind: request.kind,
    });
    Ok(())
}

/// Token state follows delivered register/disable requests.
fn apply_side_effects(ctx: &WorkerContext, request: &PendingRequest) {
    let applied = match request.kind {
        RequestKind::Register => request
            .decode::<TokenPayload>()
            .and_then(|p| ctx.identity.activate_token(&p.user_id, &p.token)),
        RequestKind::Disable => request
            .decode::<TokenPayload>()
            .and_then(|p| ctx.identity.deactivate_token(&p.user_id)),
        RequestKind::Identify | RequestKind::Track => return,
    };
    if let Err(e) = applied {
        warn!(id = %request.id, kind = %request.kind, error = %e, "failed to update token state");
    }
}

async fn retry(
    ctx: &WorkerContext,
    request: &PendingRequest,
    reason: String,
    cancel: &CancellationToken,
) -> Flow {
    let attempt = match ctx.queue.record_failure(request.id) {
        Ok(attempt) => attempt,
        Err(e) => {
            error!(id = %request.id, error = %e, "failed to record delivery failure");
            return pause(ctx.settings.backoff(1), cancel).await;
        }
    };

    if attempt >= ctx.settings.max_attempts {
        let err = DeliveryError::Permanent(format!("gave up after {attempt} attempts: {reason}"));
        if let Err(e) = give_up(ctx, request, err) {
            error!(id = %request.id, error = %e, "failed to update queue");
            return pause(ctx.settings.backoff(1), cancel).await;
        }
        return Flow::Continue;
    }

    let delay = ctx.settings.backoff(attempt);
    warn!(
        id = %request.id,
        kind = %request.kind,
        attempt,
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        reason = %reason,
        "delivery failed, retrying"
    );
    let _ = ctx.events.send(DeliveryEvent::Retrying {
        id: request.id,
        kind: request.kind,
        attempt,
        delay,
    });
    pause(delay, cancel).await
}

fn give_up(
    ctx: &WorkerContext,
    request: &PendingRequest,
    err: DeliveryError,
) -> outbound_core::Result<()> {
    ctx.queue.remove(request.id)?;
    error!(id = %request.id, kind = %request.kind, error = %err, "dropping request");
    if let Some(observer) = &ctx.observer {
        observer.on_dropped(request, &err);
    }
    let _ = ctx.events.send(DeliveryEvent::Dropped {
        id: request.id,
        kind: request.kind,
        error: err,
    });
    Ok(())
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
