//! Background transform worker.
//!
//! One blocking worker thread drains an unbounded request channel and runs
//! the same [`FormatEngine`] the inline path uses. Replies travel over a
//! second channel to a router task, which completes the caller's oneshot
//! looked up by correlation id. There is no backpressure and no
//! cancellation: every accepted request runs to completion, and replies
//! may arrive out of order.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use smartformat_core::{Element, FormatEngine, LayoutContext, TransformOptions};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::protocol::{RequestId, TransformRequest, TransformResponse};

/// Errors from the offload channel.
#[derive(Debug, Error)]
pub enum OffloadError {
    /// The worker has shut down.
    #[error("Offload channel closed")]
    ChannelClosed,
    /// The worker went away without answering.
    #[error("Worker dropped request {0}")]
    WorkerDropped(RequestId),
}

type Waiters = HashMap<RequestId, oneshot::Sender<TransformResponse>>;
type Pending = Arc<Mutex<Waiters>>;

/// Future resolving to the worker's reply for one request.
#[derive(Debug)]
pub struct PendingTransform {
    id: RequestId,
    rx: oneshot::Receiver<TransformResponse>,
}

impl PendingTransform {
    /// Correlation id of the request.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Future for PendingTransform {
    type Output = Result<TransformResponse, OffloadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map_err(|_| OffloadError::WorkerDropped(id))
    }
}

struct Shared {
    requests: Mutex<Option<mpsc::UnboundedSender<TransformRequest>>>,
    pending: Pending,
    next_id: AtomicU64,
    engine: Arc<FormatEngine>,
    router: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle to the background worker.
#[derive(Clone)]
pub struct OffloadHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OffloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffloadHandle")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl OffloadHandle {
    /// Start the worker and router. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(engine: FormatEngine) -> Self {
        let engine = Arc::new(engine);
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<TransformRequest>();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<TransformResponse>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let worker_engine = Arc::clone(&engine);
        tokio::task::spawn_blocking(move || {
            while let Some(request) = request_rx.blocking_recv() {
                let outcome = worker_engine.transform_detailed(
                    &request.elements,
                    &request.from,
                    &request.to,
                    &request.options,
                );
                let response = TransformResponse {
                    id: request.id,
                    elements: outcome.elements,
                    preset_id: outcome.preset_id,
                    fallback: outcome.fallback,
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
            tracing::debug!("Transform worker stopped");
        });

        let router_pending = Arc::clone(&pending);
        let router = tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                let waiter = router_pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&response.id);
                match waiter {
                    Some(tx) => {
                        // The caller may have stopped waiting.
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!(request_id = %response.id, "No waiter for response"),
                }
            }
        });

        Self {
            shared: Arc::new(Shared {
                requests: Mutex::new(Some(request_tx)),
                pending,
                next_id: AtomicU64::new(1),
                engine,
                router: Mutex::new(Some(router)),
            }),
        }
    }

    /// Queue a transform and return its correlation id and reply future.
    ///
    /// # Errors
    ///
    /// Returns [`OffloadError::ChannelClosed`] after [`Self::shutdown`].
    pub fn submit(
        &self,
        elements: Vec<Element>,
        from: LayoutContext,
        to: LayoutContext,
        options: TransformOptions,
    ) -> Result<(RequestId, PendingTransform), OffloadError> {
        let id = RequestId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending().insert(id, tx);

        tracing::debug!(
            request_id = %id,
            elements = elements.len(),
            format_key = %to.format_key(),
            "Offloading transform"
        );

        let request = TransformRequest {
            id,
            elements,
            from,
            to,
            options,
        };
        let sent = self
            .shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|sender| sender.send(request).is_ok());

        if sent == Some(true) {
            Ok((id, PendingTransform { id, rx }))
        } else {
            self.pending().remove(&id);
            Err(OffloadError::ChannelClosed)
        }
    }

    /// Transform, offloaded when `options.use_offload` is set.
    ///
    /// Any offload failure is logged and the transform runs inline instead,
    /// with identical results.
    pub async fn transform(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        to: &LayoutContext,
        options: &TransformOptions,
    ) -> Vec<Element> {
        if !options.use_offload {
            return self.shared.engine.transform(elements, from, to, options);
        }

        let submitted = self.submit(elements.to_vec(), from.clone(), to.clone(), options.clone());
        let offloaded = match submitted {
            Ok((_, pending)) => pending.await,
            Err(e) => Err(e),
        };
        match offloaded {
            Ok(response) => response.elements,
            Err(e) => {
                tracing::warn!(
                    format_key = %to.format_key(),
                    "Offload unavailable, transforming inline: {e}"
                );
                self.shared.engine.transform(elements, from, to, options)
            }
        }
    }

    /// Transform one layout into several formats concurrently.
    ///
    /// Results are in the order of `targets`.
    pub async fn transform_many(
        &self,
        elements: &[Element],
        from: &LayoutContext,
        targets: &[LayoutContext],
        options: &TransformOptions,
    ) -> Vec<Vec<Element>> {
        futures::future::join_all(
            targets
                .iter()
                .map(|to| self.transform(elements, from, to, options)),
        )
        .await
    }

    /// Requests submitted but not yet answered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending().len()
    }

    /// Close the request channel and wait for queued work to drain.
    ///
    /// Later calls to [`Self::transform`] run inline.
    pub async fn shutdown(&self) {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let router = self
            .shared
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(router) = router {
            if let Err(e) = router.await {
                tracing::warn!("Offload router ended abnormally: {e}");
            }
        }
        tracing::debug!("Offload worker shut down");
    }

    fn pending(&self) -> MutexGuard<'_, Waiters> {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
