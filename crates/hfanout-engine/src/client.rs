//! `HttpClient` — the engine instance and transfer-engine adapter.
//!
//! Single-threaded cooperative reactor: exactly one thread runs
//! [`HttpClient::process_one`]; callers on any thread submit through a
//! cloneable [`HttpClientHandle`]. The adapter owns the transfer engine and
//! translates between its push callbacks ([`EngineHost`]) and the epoll
//! reactor's pull-based readiness events.
//!
//! Dispatch per ready descriptor:
//! - wakeup fd: drain coalesced signals, admit queued requests up to the
//!   free slot count;
//! - timer fd: clear the expiration edge, drive "check timeouts", reap;
//! - anything else: drive "socket action" for that descriptor, reap.
//!
//! Reaping a completion releases the slot and re-signals the wakeup fd, so
//! freed capacity immediately considers newly queued requests — that is the
//! mechanism that keeps the pool saturated without polling.

use crate::connection::transfer_options;
use crate::epoller::{Epoller, EpollEvent, Interest};
use crate::pool::ConnectionPool;
use crate::queue::RequestQueue;
use crate::timer::TimerFd;
use crate::wakeup::WakeupFd;

use hfanout_core::callbacks::HttpClientCallbacks;
use hfanout_core::error::{ClientError, Result, TransferError};
use hfanout_core::method::Method;
use hfanout_core::request::{HttpRequest, Params, RequestContent};
use hfanout_core::transfer::{
    EngineHost, MultiCode, SocketInterest, TransferCode, TransferEngine, TransferId,
};

use std::os::unix::io::RawFd;
use std::sync::Arc;

/// Construction-time configuration.
///
/// `queue_size` greater than zero is rejected at build time: bounded-queue
/// semantics are declared but not implemented.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    base_url: String,
    parallelism: usize,
    queue_size: usize,
    debug: bool,
    ssl_checks: bool,
    tcp_no_delay: bool,
    pipelining: bool,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            parallelism: 4,
            queue_size: 0,
            debug: false,
            ssl_checks: true,
            tcp_no_delay: false,
            pipelining: false,
        }
    }

    /// Fixed pool capacity; must be at least 1.
    pub fn parallelism(mut self, n: usize) -> Self {
        self.parallelism = n;
        self
    }

    /// Declared but unsupported; any nonzero value fails construction.
    pub fn queue_size(mut self, n: usize) -> Self {
        self.queue_size = n;
        self
    }

    pub fn debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    /// TLS certificate/host verification, default on. Disabling is insecure
    /// and intended for testing only.
    pub fn ssl_checks(mut self, value: bool) -> Self {
        self.ssl_checks = value;
        self
    }

    pub fn tcp_no_delay(mut self, value: bool) -> Self {
        self.tcp_no_delay = value;
        self
    }

    pub fn pipelining(mut self, value: bool) -> Self {
        self.pipelining = value;
        self
    }
}

/// Cloneable cross-thread submission handle.
#[derive(Clone)]
pub struct HttpClientHandle {
    base_url: String,
    queue: Arc<RequestQueue>,
    wakeup: Arc<WakeupFd>,
}

impl HttpClientHandle {
    /// Enqueue a request and wake the reactor.
    ///
    /// Always returns `true`: the queue is unbounded (a bounded queue would
    /// be the unimplemented `queue_size` feature).
    pub fn enqueue(
        &self,
        method: Method,
        resource: &str,
        callbacks: Arc<dyn HttpClientCallbacks>,
        content: RequestContent,
        query_params: &Params,
        headers: Params,
        timeout_secs: Option<u32>,
    ) -> bool {
        let url = format!("{}{}{}", self.base_url, resource, query_params.uri_escaped());
        self.queue.push(Arc::new(HttpRequest::new(
            method,
            url,
            callbacks,
            content,
            headers,
            timeout_secs,
        )));

        // Wake the reactor so it sees that there is something new to do.
        if let Err(e) = self.wakeup.signal() {
            log::error!("wakeup signal failed: {}", e);
        }
        true
    }
}

/// The engine instance: reactor, wakeup signal, timer, slot pool, request
/// queue, and the transfer engine behind the adapter.
pub struct HttpClient<E: TransferEngine> {
    config: HttpClientConfig,
    epoller: Epoller,
    wakeup: Arc<WakeupFd>,
    timer: TimerFd,
    pool: ConnectionPool,
    queue: Arc<RequestQueue>,
    engine: E,
    /// Set by a `timer_request(0)` during a drive call; consumed by a
    /// synchronous re-drive before returning to the event loop.
    immediate_kick: bool,
}

impl<E: TransferEngine> HttpClient<E> {
    pub fn new(config: HttpClientConfig, mut engine: E) -> Result<Self> {
        if config.queue_size > 0 {
            return Err(ClientError::QueueSizeUnsupported);
        }
        if config.parallelism == 0 {
            return Err(ClientError::InvalidParallelism(0));
        }

        let epoller = Epoller::new()?;
        let wakeup = Arc::new(WakeupFd::new()?);
        let timer = TimerFd::new()?;
        epoller.add_fd(wakeup.fd(), Interest::READABLE)?;
        epoller.add_fd(timer.fd(), Interest::READABLE)?;

        engine.set_pipelining(config.pipelining);

        let pool = ConnectionPool::new(config.parallelism);
        let queue = Arc::new(RequestQueue::new());

        let mut client = Self {
            config,
            epoller,
            wakeup,
            timer,
            pool,
            queue,
            engine,
            immediate_kick: false,
        };
        // Kick-start the engine so it can schedule its first timeout.
        client.drive_timeout()?;
        Ok(client)
    }

    /// Submission handle usable from any thread.
    pub fn handle(&self) -> HttpClientHandle {
        HttpClientHandle {
            base_url: self.config.base_url.clone(),
            queue: Arc::clone(&self.queue),
            wakeup: Arc::clone(&self.wakeup),
        }
    }

    /// Convenience for same-thread submission; see
    /// [`HttpClientHandle::enqueue`].
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &self,
        method: Method,
        resource: &str,
        callbacks: Arc<dyn HttpClientCallbacks>,
        content: RequestContent,
        query_params: &Params,
        headers: Params,
        timeout_secs: Option<u32>,
    ) -> bool {
        self.handle()
            .enqueue(method, resource, callbacks, content, query_params, headers, timeout_secs)
    }

    /// Descriptor usable by an outer poll loop for embedding.
    pub fn select_fd(&self) -> RawFd {
        self.epoller.select_fd()
    }

    pub fn queued_requests(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.pool.in_use()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Block until one registered descriptor is ready, dispatch it once.
    pub fn process_one(&mut self) -> Result<()> {
        let event = self.epoller.wait_one()?;
        if event.fd == self.wakeup.fd() {
            self.handle_wakeup()
        } else if event.fd == self.timer.fd() {
            self.handle_timer()
        } else {
            self.handle_socket(event)
        }
    }

    /// Run the loop until no request is queued or in flight.
    pub fn run_until_idle(&mut self) -> Result<()> {
        while self.queued_requests() > 0 || self.in_flight() > 0 {
            self.process_one()?;
        }
        Ok(())
    }

    fn handle_wakeup(&mut self) -> Result<()> {
        // Deduplication of wakeup events.
        self.wakeup.drain();
        self.admit_queued()
    }

    fn handle_timer(&mut self) -> Result<()> {
        // Clear the timer fd by reading the missed-expiration count.
        self.timer.consume_expirations();
        self.drive_timeout()
    }

    fn handle_socket(&mut self, event: EpollEvent) -> Result<()> {
        let code = {
            let mut host = HostFacade {
                epoller: &self.epoller,
                timer: &self.timer,
                pool: &mut self.pool,
                immediate_kick: &mut self.immediate_kick,
            };
            self.engine
                .socket_action(event.fd, event.readable, event.writable, &mut host)?
        };
        if code != MultiCode::OK {
            return Err(ClientError::EngineDesync(code.0));
        }
        self.reap_completions()?;
        self.kick_if_requested()
    }

    /// Dequeue up to the free slot count, bind each request to a slot, and
    /// register the transfer with the engine.
    fn admit_queued(&mut self) -> Result<()> {
        let available = self.pool.available();
        if available == 0 {
            return Ok(());
        }
        let requests = self.queue.pop_up_to(available);
        for request in requests {
            let Some(idx) = self.pool.acquire() else {
                // Computed availability above; cannot run dry within the loop.
                debug_assert!(false, "slot pool drained mid-admission");
                break;
            };
            let options = transfer_options(
                &request,
                self.config.ssl_checks,
                self.config.tcp_no_delay,
                self.config.debug,
            );
            log::debug!("admit {} {} on slot {}", request.method(), request.url(), idx);
            if let Some(conn) = self.pool.get_mut(idx) {
                conn.bind(request);
            }

            let code = {
                let mut host = HostFacade {
                    epoller: &self.epoller,
                    timer: &self.timer,
                    pool: &mut self.pool,
                    immediate_kick: &mut self.immediate_kick,
                };
                self.engine
                    .add_transfer(TransferId(idx), options, &mut host)?
            };
            if !code.is_accepted() {
                return Err(ClientError::EngineDesync(code.0));
            }
        }
        self.reap_completions()?;
        self.kick_if_requested()
    }

    /// Drive the engine's "check timeouts" entry point, then reap; repeat
    /// while the engine keeps requesting an immediate re-drive.
    fn drive_timeout(&mut self) -> Result<()> {
        loop {
            let code = {
                let mut host = HostFacade {
                    epoller: &self.epoller,
                    timer: &self.timer,
                    pool: &mut self.pool,
                    immediate_kick: &mut self.immediate_kick,
                };
                self.engine.timeout_action(&mut host)?
            };
            if code != MultiCode::OK {
                return Err(ClientError::EngineDesync(code.0));
            }
            self.reap_completions()?;
            if !std::mem::take(&mut self.immediate_kick) {
                return Ok(());
            }
        }
    }

    fn kick_if_requested(&mut self) -> Result<()> {
        if std::mem::take(&mut self.immediate_kick) {
            self.drive_timeout()?;
        }
        Ok(())
    }

    /// Drain the engine's finished-transfer list: notify, reset, deregister,
    /// release, and re-signal the wakeup fd so freed capacity immediately
    /// considers queued requests.
    fn reap_completions(&mut self) -> Result<()> {
        let mut finished = Vec::new();
        self.engine.drain_finished(&mut finished);
        for (id, code) in finished {
            let idx = id.0;
            let request = self
                .pool
                .get_mut(idx)
                .and_then(|conn| conn.reset())
                .ok_or(ClientError::UnknownTransfer(idx))?;
            request.callbacks().on_done(&request, translate_error(code));

            let multi = {
                let mut host = HostFacade {
                    epoller: &self.epoller,
                    timer: &self.timer,
                    pool: &mut self.pool,
                    immediate_kick: &mut self.immediate_kick,
                };
                self.engine.remove_transfer(id, &mut host)?
            };
            if !multi.is_accepted() {
                return Err(ClientError::EngineDesync(multi.0));
            }
            self.pool.release(idx);
            self.wakeup.signal()?;
        }
        Ok(())
    }
}

/// Disjoint-field view of the client handed to the engine during drive
/// calls, so the engine's synchronous callbacks can touch the reactor,
/// timer, and connection slots without aliasing the engine itself.
struct HostFacade<'a> {
    epoller: &'a Epoller,
    timer: &'a TimerFd,
    pool: &'a mut ConnectionPool,
    immediate_kick: &'a mut bool,
}

impl EngineHost for HostFacade<'_> {
    fn socket_interest(
        &mut self,
        fd: RawFd,
        interest: SocketInterest,
        is_new: bool,
    ) -> Result<()> {
        log::debug!(
            "socket interest fd={} in={} out={} new={}",
            fd,
            interest.input,
            interest.output,
            is_new
        );
        if interest.is_none() {
            self.epoller.remove_fd(fd)
        } else {
            let mask = Interest {
                readable: interest.input,
                writable: interest.output,
            };
            if is_new {
                self.epoller.add_fd(fd, mask)
            } else {
                self.epoller.modify_fd(fd, mask)
            }
        }
    }

    fn timer_request(&mut self, timeout_ms: i64) -> Result<()> {
        log::debug!("timer request {} ms", timeout_ms);
        if timeout_ms < -1 {
            return Err(ClientError::UnhandledTimeout(timeout_ms));
        }
        self.timer.arm(timeout_ms)?;
        if timeout_ms == 0 {
            // Drive again synchronously, within the same call.
            *self.immediate_kick = true;
        }
        Ok(())
    }

    fn header_line(&mut self, id: TransferId, line: &[u8]) -> Result<usize> {
        match self.pool.get_mut(id.0) {
            Some(conn) => conn.on_header_line(line),
            None => {
                log::error!("header line for unknown transfer {}", id.0);
                Ok(line.len())
            }
        }
    }

    fn body_chunk(&mut self, id: TransferId, data: &[u8]) -> usize {
        match self.pool.get(id.0) {
            Some(conn) => conn.on_body_chunk(data),
            None => {
                log::error!("body chunk for unknown transfer {}", id.0);
                data.len()
            }
        }
    }

    fn body_read(&mut self, id: TransferId, buf: &mut [u8]) -> usize {
        match self.pool.get_mut(id.0) {
            Some(conn) => conn.on_body_read(buf),
            None => {
                log::error!("body read for unknown transfer {}", id.0);
                0
            }
        }
    }
}

/// Total translation of engine result codes to client-visible kinds.
/// Codes outside the known set resolve to `Unknown` and are logged for
/// diagnosis.
fn translate_error(code: TransferCode) -> TransferError {
    match code {
        TransferCode::OK => TransferError::None,
        TransferCode::OPERATION_TIMEDOUT => TransferError::Timeout,
        TransferCode::COULDNT_RESOLVE_HOST => TransferError::HostNotFound,
        TransferCode::COULDNT_CONNECT => TransferError::CouldNotConnect,
        TransferCode::SEND_ERROR => TransferError::SendError,
        TransferCode::RECV_ERROR => TransferError::RecvError,
        other => {
            log::error!("returning 'Unknown' for engine code {}", other.0);
            TransferError::Unknown
        }
    }
}
