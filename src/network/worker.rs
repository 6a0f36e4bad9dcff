//! Isolated execution of request batches
//!
//! Each flushed batch runs on its own thread. Inside it, requests are pulled
//! from a shared queue by a bounded set of scoped threads, so one slow
//! request never holds up the rest of its batch. The finished batch is posted
//! back as a single message.

use crate::io::error::FetchError;
use crate::network::transport::{BodyFormat, Method, Payload, Transport, interpret_response};
use crossbeam_channel::{Sender, unbounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Process-unique request identifier
pub type RequestId = u64;

/// Outbound message entry: one request of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// Identifier used to route the result back
    pub id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Target URL or server-relative path
    pub url: String,
    /// Optional request body
    pub data: Option<String>,
    /// Body handling on success
    pub format: BodyFormat,
}

/// Inbound message entry: the outcome of one request
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    /// Identifier of the originating request
    pub id: RequestId,
    /// Payload on success, error marker on failure
    pub data: Result<Payload, FetchError>,
}

/// Execute one request, folding every failure into its response
///
/// A transport that panics fails only its own request.
pub fn execute(transport: &dyn Transport, request: &WireRequest) -> WireResponse {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        transport
            .send(request.method, &request.url, request.data.as_deref())
            .and_then(|response| interpret_response(&request.url, response, request.format))
    }));

    let data = attempt.unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        log::error!("request {} to '{}' panicked: {reason}", request.id, request.url);
        Err(FetchError::Transport {
            url: request.url.clone(),
            reason: format!("transport panicked: {reason}"),
        })
    });

    WireResponse {
        id: request.id,
        data,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn unavailable(id: RequestId, url: &str, reason: &str) -> WireResponse {
    WireResponse {
        id,
        data: Err(FetchError::Transport {
            url: url.to_string(),
            reason: format!("batch worker failed: {reason}"),
        }),
    }
}

/// Execute a batch with at most `concurrency` requests in flight
///
/// Responses come back in completion order, not submission order.
pub fn run_batch(
    transport: &dyn Transport,
    requests: Vec<WireRequest>,
    concurrency: usize,
) -> Vec<WireResponse> {
    let workers = concurrency.max(1).min(requests.len());
    let total = requests.len();
    let (job_tx, job_rx) = unbounded();
    let (done_tx, done_rx) = unbounded();

    for request in requests {
        // Receiver is alive in this scope
        let _ = job_tx.send(request);
    }
    drop(job_tx);

    thread::scope(|scope| {
        let mut started = 0;
        for index in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("mosaic-request-{index}"))
                .spawn_scoped(scope, move || {
                    for request in job_rx.iter() {
                        if done_tx.send(execute(transport, &request)).is_err() {
                            break;
                        }
                    }
                });
            match spawned {
                Ok(_) => started += 1,
                Err(e) => {
                    log::warn!("started {started} of {workers} request threads: {e}");
                    break;
                }
            }
        }

        // Without any worker the queued requests fail here instead of hanging
        if started == 0 {
            for request in job_rx.try_iter() {
                let _ = done_tx.send(unavailable(
                    request.id,
                    &request.url,
                    "no request thread could start",
                ));
            }
        }
    });
    drop(done_tx);

    let mut responses = Vec::with_capacity(total);
    responses.extend(done_rx.try_iter());
    responses
}

/// Run a batch on a dedicated thread and post the responses to `results`
///
/// # Errors
///
/// Returns an error if the operating system refuses to spawn the thread
pub fn spawn_batch(
    transport: Arc<dyn Transport>,
    requests: Vec<WireRequest>,
    concurrency: usize,
    results: Sender<Vec<WireResponse>>,
) -> std::io::Result<JoinHandle<()>> {
    let first_id = requests.first().map_or(0, |request| request.id);
    thread::Builder::new()
        .name(format!("mosaic-batch-{first_id}"))
        .spawn(move || {
            let size = requests.len();
            let pending: Vec<(RequestId, String)> = requests
                .iter()
                .map(|request| (request.id, request.url.clone()))
                .collect();
            let responses = panic::catch_unwind(AssertUnwindSafe(|| {
                run_batch(transport.as_ref(), requests, concurrency)
            }))
            .unwrap_or_else(|payload| {
                let reason = panic_message(payload.as_ref());
                log::error!("batch starting at request {first_id} panicked: {reason}");
                pending
                    .iter()
                    .map(|(id, url)| unavailable(*id, url, &reason))
                    .collect()
            });
            log::debug!("batch starting at request {first_id} settled {size} requests");
            if results.send(responses).is_err() {
                log::warn!("batch starting at request {first_id} finished after dispatcher shutdown");
            }
        })
}
