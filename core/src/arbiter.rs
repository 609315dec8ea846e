//! Races a request's round-trip against its timeouts.
//!
//! # Design
//! `TimeoutArbiter::execute` runs each request as one worker thread
//! (dial, write, read, parse) and arms one timer per configured duration.
//! Every participant is a capacity-one channel:
//!
//! - the worker sends the request's `Outcome` on the result channel,
//! - each timer is a `channel::after` receiver that becomes ready once.
//!
//! The caller blocks in a single `select!` over the four receivers and the
//! first ready channel decides the outcome. The losers are abandoned. Timers
//! own no thread, so an abandoned timer is just a dropped receiver. The result
//! channel has room for one value, so the worker never blocks on it and exits
//! once its blocking socket call returns.
//!
//! By default a timeout only stops the caller from waiting; the worker keeps
//! its socket until the peer answers or fails. With `cancel_in_flight` the
//! worker parks a `CancelHandle` for its connection in a shared `CancelSlot`.
//! When a timeout wins, the arbiter abandons the slot and fires whatever
//! handle it finds, so the blocked call returns. A worker that connects after
//! the slot was abandoned drops its connection instead.
//!
//! The worker also checks the write and read deadlines itself, right before
//! writing and right after reading. These checks never block and never touch
//! the arbiter's channels: a tripped deadline means the matching timer has
//! already fired, so the worker stops early and reports the same timeout.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use crossbeam::select;

use crate::config::Timeouts;
use crate::error::ClientError;
use crate::http::{self, Headers, Method, Response, WireMessage};
use crate::transport::{self, CancelHandle, Connection, Connector, ReadToClose, ResponseReader, TcpConnector};
use crate::url::{self, ResolvedTarget};

/// Result of one request execution.
pub type Outcome = Result<Response, ClientError>;

/// Everything needed to execute one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeouts: Timeouts,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// Resolve the URL and frame the request, setting `Host` from the target.
pub fn prepare(spec: &RequestSpec) -> Result<(ResolvedTarget, WireMessage), ClientError> {
    let target = url::resolve(&spec.url)?;
    let mut headers = spec.headers.clone();
    headers.insert("Host".to_string(), target.host.clone());
    let wire = http::frame_request(spec.method, &target.path, &headers, spec.body.as_deref());
    Ok((target, wire))
}

/// A deadline the worker can inspect without waiting on it.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    deadline: Option<(Instant, Duration)>,
}

impl Checkpoint {
    fn new(start: Instant, duration: Option<Duration>) -> Self {
        Self {
            deadline: active(duration).map(|d| (start + d, d)),
        }
    }

    /// The configured duration, if the deadline has passed.
    fn tripped(&self) -> Option<Duration> {
        self.deadline
            .filter(|(at, _)| Instant::now() >= *at)
            .map(|(_, d)| d)
    }
}

fn active(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|d| !d.is_zero())
}

enum SlotState {
    Empty,
    Armed(CancelHandle),
    Abandoned,
}

/// Hand-off point for a connection's cancel handle.
///
/// The worker arms it once connected; the arbiter abandons it when a timeout
/// wins. Whichever side comes second sees the other's move.
struct CancelSlot(Mutex<SlotState>);

impl CancelSlot {
    fn new() -> Self {
        Self(Mutex::new(SlotState::Empty))
    }

    /// Store the handle. False if the arbiter already gave up on the request.
    fn arm(&self, handle: CancelHandle) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SlotState::Abandoned) {
            return false;
        }
        *state = SlotState::Armed(handle);
        true
    }

    /// Mark the request abandoned and take the handle, if one was armed.
    fn abandon(&self) -> Option<CancelHandle> {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, SlotState::Abandoned) {
            SlotState::Armed(handle) => Some(handle),
            SlotState::Empty | SlotState::Abandoned => None,
        }
    }
}

/// Executes requests on background threads under up to three timeouts.
pub struct TimeoutArbiter<C: Connector = TcpConnector> {
    connector: Arc<C>,
    reader: Arc<dyn ResponseReader>,
    cancel_in_flight: bool,
}

impl<C: Connector> fmt::Debug for TimeoutArbiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutArbiter")
            .field("cancel_in_flight", &self.cancel_in_flight)
            .finish_non_exhaustive()
    }
}

impl TimeoutArbiter<TcpConnector> {
    pub fn new() -> Self {
        Self::with_connector(TcpConnector)
    }
}

impl Default for TimeoutArbiter<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> TimeoutArbiter<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            reader: Arc::new(ReadToClose),
            cancel_in_flight: false,
        }
    }

    /// Replace the strategy that decides when a response is complete.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn ResponseReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Shut the socket down when a timeout wins.
    #[must_use]
    pub fn with_cancel_in_flight(mut self, cancel: bool) -> Self {
        self.cancel_in_flight = cancel;
        self
    }

    pub fn execute(&self, spec: &RequestSpec) -> Outcome {
        let (target, wire) = prepare(spec)?;
        let addr = target.address();
        let timeouts = spec.timeouts;
        let start = Instant::now();

        let (result_tx, result_rx) = channel::bounded::<Outcome>(1);
        let cancel_slot = self.cancel_in_flight.then(|| Arc::new(CancelSlot::new()));

        let worker = Worker {
            connector: Arc::clone(&self.connector),
            reader: Arc::clone(&self.reader),
            addr,
            wire,
            write_checkpoint: Checkpoint::new(start, timeouts.write),
            read_checkpoint: Checkpoint::new(start, timeouts.read),
            cancel_slot: cancel_slot.clone(),
        };
        tracing::debug!(method = %spec.method, addr = %worker.addr, "starting request");
        thread::Builder::new()
            .name("rawhttp-worker".to_string())
            .spawn(move || {
                let outcome = worker.run();
                // The arbiter may have stopped listening; that is fine.
                let _ = result_tx.try_send(outcome);
            })
            .map_err(ClientError::Spawn)?;

        let overall_rx = start_timer(start, timeouts.overall);
        let write_rx = start_timer(start, timeouts.write);
        let read_rx = start_timer(start, timeouts.read);

        let outcome = select! {
            recv(result_rx) -> msg => msg.unwrap_or(Err(ClientError::WorkerLost)),
            recv(overall_rx) -> _ => Err(ClientError::Timeout(timeouts.overall.unwrap_or_default())),
            recv(read_rx) -> _ => Err(ClientError::ReadTimeout(timeouts.read.unwrap_or_default())),
            recv(write_rx) -> _ => Err(ClientError::WriteTimeout(timeouts.write.unwrap_or_default())),
        };

        if matches!(outcome, Err(ref e) if e.is_timeout()) {
            if let Some(handle) = cancel_slot.as_deref().and_then(CancelSlot::abandon) {
                tracing::debug!("cancelling in-flight connection");
                handle.cancel();
            }
        }
        tracing::debug!(elapsed = ?start.elapsed(), ok = outcome.is_ok(), "request settled");
        outcome
    }
}

/// One-shot receiver that fires `duration` after `start`. No duration, no timer.
fn start_timer(start: Instant, duration: Option<Duration>) -> Receiver<Instant> {
    match active(duration) {
        Some(duration) => channel::after(duration.saturating_sub(start.elapsed())),
        None => channel::never(),
    }
}

struct Worker<C: Connector> {
    connector: Arc<C>,
    reader: Arc<dyn ResponseReader>,
    addr: String,
    wire: WireMessage,
    write_checkpoint: Checkpoint,
    read_checkpoint: Checkpoint,
    cancel_slot: Option<Arc<CancelSlot>>,
}

impl<C: Connector> Worker<C> {
    fn run(self) -> Outcome {
        let mut conn = transport::dial(&*self.connector, &self.addr)?;
        tracing::trace!(addr = %self.addr, "connected");

        if let Some(slot) = &self.cancel_slot {
            if let Some(handle) = conn.cancel_handle() {
                if !slot.arm(handle) {
                    tracing::trace!("caller gave up before connect; dropping connection");
                    return Err(ClientError::Cancelled);
                }
            }
        }

        if let Some(d) = self.write_checkpoint.tripped() {
            tracing::debug!(timeout = ?d, "write deadline passed before write");
            return Err(ClientError::WriteTimeout(d));
        }
        let written = transport::write_request(&mut conn, &self.wire)?;
        tracing::trace!(written, "request written");

        let raw = self.reader.read_response(&mut conn).map_err(ClientError::Read)?;
        tracing::trace!(read = raw.len(), "response read");
        if let Some(d) = self.read_checkpoint.tripped() {
            tracing::debug!(timeout = ?d, "read deadline passed during read");
            return Err(ClientError::ReadTimeout(d));
        }

        http::parse_response(&raw)
    }
}
