//! Request batching with size and idle-window flushing
//!
//! Callers enqueue small requests; the dispatcher collects them into an open
//! batch and flushes it either when it reaches `max_requests` or when the idle
//! window that started with the batch's first request elapses. A flushed batch
//! executes on a worker thread and its results are routed back to each caller
//! by request id.
//!
//! Three kinds of threads cooperate:
//! - callers, which may flush synchronously on the size trigger
//! - one idle timer, which flushes the batch generation it was armed for
//! - one router, which settles callers as batch results arrive

use crate::io::configuration::{
    DEFAULT_IDLE_WINDOW_MS, DEFAULT_MAX_BATCH_REQUESTS, DEFAULT_WORKER_CONCURRENCY,
};
use crate::io::error::{FetchError, Result, invalid_parameter};
use crate::network::transport::{BodyFormat, Method, Payload, Transport};
use crate::network::worker::{RequestId, WireRequest, WireResponse, spawn_batch};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Outcome delivered to a caller
pub type Outcome = std::result::Result<Payload, FetchError>;

/// One-shot callback receiving a request's outcome
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Batching parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Batch size that triggers an immediate flush
    pub max_requests: usize,
    /// Delay after a batch's first request before it flushes on its own
    pub idle_window: Duration,
    /// Requests executed in parallel within one batch
    pub worker_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_BATCH_REQUESTS,
            idle_window: Duration::from_millis(DEFAULT_IDLE_WINDOW_MS),
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
        }
    }
}

impl DispatcherConfig {
    /// Check that every parameter is usable
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size or worker concurrency is zero
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(invalid_parameter(
                "max_requests",
                &self.max_requests,
                &"must be positive",
            ));
        }
        if self.worker_concurrency == 0 {
            return Err(invalid_parameter(
                "worker_concurrency",
                &self.worker_concurrency,
                &"must be positive",
            ));
        }
        Ok(())
    }
}

/// Request waiting to be enqueued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Target URL or server-relative path
    pub url: String,
    /// Optional body
    pub data: Option<String>,
    /// Body handling on success
    pub format: BodyFormat,
}

impl Request {
    /// GET request with negotiated body handling
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            data: None,
            format: BodyFormat::Negotiate,
        }
    }

    /// POST request with negotiated body handling
    pub fn post(url: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            data: Some(data.into()),
            format: BodyFormat::Negotiate,
        }
    }

    /// Keep the response body as raw text whatever its media type
    #[must_use]
    pub const fn raw_text(mut self) -> Self {
        self.format = BodyFormat::Text;
        self
    }
}

/// Handle on an enqueued request's eventual outcome
#[derive(Debug)]
pub struct Ticket {
    id: RequestId,
    receiver: Receiver<Outcome>,
}

impl Ticket {
    /// Identifier assigned to the request
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Block until the request settles
    ///
    /// # Errors
    ///
    /// Returns the request's failure, or [`FetchError::Disconnected`] if the
    /// dispatcher went away first
    pub fn wait(self) -> Outcome {
        self.receiver
            .recv()
            .unwrap_or(Err(FetchError::Disconnected))
    }

    /// Block for at most `timeout`, returning `None` if still unsettled
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Counters describing dispatcher activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Requests enqueued
    pub requests: usize,
    /// Batches flushed by either trigger
    pub flushes: usize,
    /// Flushes caused by reaching `max_requests`
    pub size_flushes: usize,
    /// Flushes caused by the idle window elapsing
    pub idle_flushes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    Size,
    Idle,
    Shutdown,
}

#[derive(Default)]
struct OpenBatch {
    requests: Vec<WireRequest>,
    generation: u64,
}

impl OpenBatch {
    // Clears the batch and invalidates any idle timer armed for it
    fn take(&mut self) -> Vec<WireRequest> {
        self.generation += 1;
        std::mem::take(&mut self.requests)
    }
}

struct IdleDeadline {
    generation: u64,
    at: Instant,
}

struct Shared {
    config: DispatcherConfig,
    transport: Arc<dyn Transport>,
    batch: Mutex<OpenBatch>,
    callers: Mutex<HashMap<RequestId, Completion>>,
    next_id: AtomicU64,
    poisoned: AtomicBool,
    requests: AtomicUsize,
    size_flushes: AtomicUsize,
    idle_flushes: AtomicUsize,
    shutdown_flushes: AtomicUsize,
    batches: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn flush(
        &self,
        requests: Vec<WireRequest>,
        trigger: FlushTrigger,
        results: &Sender<Vec<WireResponse>>,
    ) {
        if requests.is_empty() {
            return;
        }
        let counter = match trigger {
            FlushTrigger::Size => &self.size_flushes,
            FlushTrigger::Idle => &self.idle_flushes,
            FlushTrigger::Shutdown => &self.shutdown_flushes,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        log::debug!("flushing {} requests ({trigger:?})", requests.len());

        let ids: Vec<RequestId> = requests.iter().map(|request| request.id).collect();
        match spawn_batch(
            Arc::clone(&self.transport),
            requests,
            self.config.worker_concurrency,
            results.clone(),
        ) {
            Ok(handle) => {
                let mut batches = self.batches.lock();
                batches.retain(|batch| !batch.is_finished());
                batches.push(handle);
            }
            Err(e) => {
                log::error!("failed to start batch worker: {e}");
                for id in ids {
                    self.settle(
                        id,
                        Err(FetchError::Transport {
                            url: String::new(),
                            reason: format!("batch worker unavailable: {e}"),
                        }),
                    );
                }
            }
        }
    }

    fn settle(&self, id: RequestId, outcome: Outcome) -> bool {
        let Some(completion) = self.callers.lock().remove(&id) else {
            return false;
        };
        completion(outcome);
        true
    }

    // Fails every caller still waiting; used once the id mapping can no
    // longer be trusted
    fn poison(&self, id: RequestId) {
        self.poisoned.store(true, Ordering::SeqCst);
        let stranded: Vec<Completion> = self
            .callers
            .lock()
            .drain()
            .map(|(_, completion)| completion)
            .collect();
        log::error!(
            "batch result for unknown request id {id}; failing {} outstanding requests",
            stranded.len()
        );
        for completion in stranded {
            completion(Err(FetchError::Protocol { id }));
        }
    }
}

/// Groups requests into concurrently executed batches
pub struct Dispatcher {
    shared: Arc<Shared>,
    results: Option<Sender<Vec<WireResponse>>>,
    timer: Option<Sender<IdleDeadline>>,
    timer_thread: Option<JoinHandle<()>>,
    router_thread: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start a dispatcher sending requests through `transport`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its background
    /// threads cannot be spawned
    pub fn new(transport: Arc<dyn Transport>, config: DispatcherConfig) -> Result<Self> {
        config.validate()?;

        let (results_tx, results_rx) = unbounded();
        let (timer_tx, timer_rx) = unbounded();
        let shared = Arc::new(Shared {
            config,
            transport,
            batch: Mutex::new(OpenBatch::default()),
            callers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            poisoned: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            size_flushes: AtomicUsize::new(0),
            idle_flushes: AtomicUsize::new(0),
            shutdown_flushes: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        });

        let router = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("mosaic-router".to_string())
                .spawn(move || route_results(&shared, &results_rx))?
        };
        let timer = {
            let shared = Arc::clone(&shared);
            let results = results_tx.clone();
            thread::Builder::new()
                .name("mosaic-idle-timer".to_string())
                .spawn(move || run_idle_timer(&shared, &timer_rx, &results))?
        };

        Ok(Self {
            shared,
            results: Some(results_tx),
            timer: Some(timer_tx),
            timer_thread: Some(timer),
            router_thread: Some(router),
        })
    }

    /// Batching parameters in effect
    pub fn config(&self) -> DispatcherConfig {
        self.shared.config
    }

    /// Enqueue a request, returning a handle on its outcome
    pub fn enqueue(&self, request: Request) -> Ticket {
        let (sender, receiver) = bounded(1);
        let id = self.enqueue_with(
            request,
            Box::new(move |outcome| {
                // Ticket may have been dropped by an uninterested caller
                let _ = sender.send(outcome);
            }),
        );
        Ticket { id, receiver }
    }

    /// Enqueue a request whose outcome is delivered to `completion`
    ///
    /// The completion runs exactly once, on a dispatcher thread unless the
    /// dispatcher is already unusable, in which case it runs immediately.
    pub fn enqueue_with(&self, request: Request, completion: Completion) -> RequestId {
        let shared = &self.shared;
        let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
        shared.requests.fetch_add(1, Ordering::SeqCst);

        if shared.poisoned.load(Ordering::SeqCst) {
            completion(Err(FetchError::Protocol { id }));
            return id;
        }
        shared.callers.lock().insert(id, completion);

        let wire = WireRequest {
            id,
            method: request.method,
            url: request.url,
            data: request.data,
            format: request.format,
        };

        let (full, arm) = {
            let mut batch = shared.batch.lock();
            batch.requests.push(wire);
            if batch.requests.len() >= shared.config.max_requests {
                (Some(batch.take()), None)
            } else if batch.requests.len() == 1 {
                (None, Some(batch.generation))
            } else {
                (None, None)
            }
        };

        if let Some(requests) = full {
            self.flush(requests, FlushTrigger::Size);
        } else if let Some(generation) = arm {
            let deadline = IdleDeadline {
                generation,
                at: Instant::now() + shared.config.idle_window,
            };
            if self
                .timer
                .as_ref()
                .is_none_or(|timer| timer.send(deadline).is_err())
            {
                let requests = shared.batch.lock().take();
                self.flush(requests, FlushTrigger::Idle);
            }
        }

        id
    }

    /// Flush the open batch now, whatever its size
    pub fn flush_now(&self) {
        let requests = self.shared.batch.lock().take();
        self.flush(requests, FlushTrigger::Shutdown);
    }

    fn flush(&self, requests: Vec<WireRequest>, trigger: FlushTrigger) {
        if let Some(results) = &self.results {
            self.shared.flush(requests, trigger, results);
        }
    }

    /// Requests enqueued but not yet settled
    pub fn outstanding(&self) -> usize {
        self.shared.callers.lock().len()
    }

    /// Snapshot of activity counters
    pub fn stats(&self) -> DispatcherStats {
        let shared = &self.shared;
        let size_flushes = shared.size_flushes.load(Ordering::SeqCst);
        let idle_flushes = shared.idle_flushes.load(Ordering::SeqCst);
        DispatcherStats {
            requests: shared.requests.load(Ordering::SeqCst),
            flushes: size_flushes + idle_flushes + shared.shutdown_flushes.load(Ordering::SeqCst),
            size_flushes,
            idle_flushes,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Disconnecting the timer makes it exit without waiting out its deadline
        self.timer.take();
        if let Some(timer) = self.timer_thread.take() {
            join_logged(timer);
        }
        self.flush_now();

        let batches = std::mem::take(&mut *self.shared.batches.lock());
        for batch in batches {
            join_logged(batch);
        }

        // Router exits once the last results sender is gone
        self.results.take();
        if let Some(router) = self.router_thread.take() {
            join_logged(router);
        }

        let stranded: Vec<Completion> = self
            .shared
            .callers
            .lock()
            .drain()
            .map(|(_, completion)| completion)
            .collect();
        for completion in stranded {
            completion(Err(FetchError::Disconnected));
        }
    }
}

fn join_logged(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    if handle.join().is_err() {
        log::error!("dispatcher thread {name} panicked");
    }
}

fn route_results(shared: &Shared, results: &Receiver<Vec<WireResponse>>) {
    for batch in results.iter() {
        for response in batch {
            if !shared.settle(response.id, response.data) {
                shared.poison(response.id);
            }
        }
    }
}

fn run_idle_timer(
    shared: &Shared,
    deadlines: &Receiver<IdleDeadline>,
    results: &Sender<Vec<WireResponse>>,
) {
    let mut armed: Option<IdleDeadline> = None;
    loop {
        let Some(current) = armed.take() else {
            match deadlines.recv() {
                Ok(deadline) => {
                    armed = Some(deadline);
                    continue;
                }
                Err(_) => return,
            }
        };

        match deadlines.recv_deadline(current.at) {
            // A later generation means the armed batch has already been taken
            Ok(next) if next.generation >= current.generation => armed = Some(next),
            Ok(_) => armed = Some(current),
            Err(RecvTimeoutError::Timeout) => {
                let requests = {
                    let mut batch = shared.batch.lock();
                    if batch.generation != current.generation {
                        continue;
                    }
                    batch.take()
                };
                shared.flush(requests, FlushTrigger::Idle, results);
            }
            // Shutdown flushes whatever is still open
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
