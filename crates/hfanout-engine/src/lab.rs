//! `LabEngine` — deterministic scripted transfer engine.
//!
//! Stands in for the real wire engine in tests and demos. Each transfer
//! follows a [`LabScript`]: a sequence of steps (header line, body chunk,
//! upload read, finish) advanced one step per drive call. While any
//! timer-driven transfer has work left, the engine re-requests
//! `timer_request(0)`, so the adapter's synchronous re-drive loop carries
//! transfers to completion without real I/O. A script may instead be bound
//! to a caller-supplied descriptor, in which case it only advances on
//! `socket_action` for that descriptor — exercising the reactor path.

use hfanout_core::error::Result;
use hfanout_core::transfer::{
    EngineHost, MultiCode, SocketInterest, TransferCode, TransferEngine, TransferId,
    TransferOptions,
};

use std::collections::VecDeque;
use std::os::unix::io::RawFd;

#[derive(Debug, Clone)]
enum LabStep {
    Header(Vec<u8>),
    Body(Vec<u8>),
    /// Pull upload bytes through `body_read` with this buffer capacity,
    /// once per drive, until the host reports end of body.
    ReadUpload(usize),
    Finish(TransferCode),
}

/// Scripted behavior for one transfer.
#[derive(Debug, Clone, Default)]
pub struct LabScript {
    steps: VecDeque<LabStep>,
    socket: Option<RawFd>,
}

impl LabScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance only on socket events for `fd` (registered with write
    /// interest) instead of the timer path.
    pub fn over_socket(mut self, fd: RawFd) -> Self {
        self.socket = Some(fd);
        self
    }

    pub fn header(mut self, line: &str) -> Self {
        self.steps.push_back(LabStep::Header(line.as_bytes().to_vec()));
        self
    }

    pub fn body(mut self, data: &[u8]) -> Self {
        self.steps.push_back(LabStep::Body(data.to_vec()));
        self
    }

    pub fn read_upload(mut self, buffer_capacity: usize) -> Self {
        self.steps.push_back(LabStep::ReadUpload(buffer_capacity));
        self
    }

    pub fn finish(mut self, code: TransferCode) -> Self {
        self.steps.push_back(LabStep::Finish(code));
        self
    }

    /// Minimal successful exchange: status line, blank line, body, done.
    pub fn simple_ok(body: &[u8]) -> Self {
        let mut script = Self::new()
            .header("HTTP/1.1 200 OK\r\n")
            .header(&format!("Content-Length: {}\r\n", body.len()))
            .header("\r\n");
        if !body.is_empty() {
            script = script.body(body);
        }
        script.finish(TransferCode::OK)
    }
}

struct LabTransfer {
    id: TransferId,
    script: LabScript,
    uploaded: usize,
    done: bool,
}

/// Counters exposed for assertions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabStats {
    /// Highest number of simultaneously active transfers observed.
    pub max_active: usize,
    /// Total upload bytes pulled through `body_read`.
    pub total_uploaded: usize,
    pub adds: usize,
    pub removes: usize,
}

#[derive(Default)]
pub struct LabEngine {
    /// Scripts handed to transfers in add order.
    pending_scripts: VecDeque<LabScript>,
    /// Fallback cloned for transfers without an explicit script.
    default_script: Option<LabScript>,
    active: Vec<LabTransfer>,
    finished: Vec<(TransferId, TransferCode)>,
    pipelining: bool,
    stats: LabStats,
}

impl LabEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next added transfer (FIFO).
    pub fn push_script(&mut self, script: LabScript) {
        self.pending_scripts.push_back(script);
    }

    /// Script used by any transfer without an explicitly queued one.
    pub fn set_default_script(&mut self, script: LabScript) {
        self.default_script = Some(script);
    }

    pub fn stats(&self) -> LabStats {
        self.stats
    }

    pub fn pipelining(&self) -> bool {
        self.pipelining
    }

    fn live_count(&self) -> usize {
        self.active.iter().filter(|t| !t.done).count()
    }

    fn next_script(&mut self) -> LabScript {
        self.pending_scripts
            .pop_front()
            .or_else(|| self.default_script.clone())
            .unwrap_or_else(|| LabScript::simple_ok(b""))
    }

    /// Run one script step. An exhausted script finishes with OK.
    fn advance(
        transfer: &mut LabTransfer,
        finished: &mut Vec<(TransferId, TransferCode)>,
        stats: &mut LabStats,
        host: &mut dyn EngineHost,
    ) -> Result<()> {
        let step = match transfer.script.steps.front() {
            Some(step) => step.clone(),
            None => LabStep::Finish(TransferCode::OK),
        };
        match step {
            LabStep::Header(line) => {
                host.header_line(transfer.id, &line)?;
                transfer.script.steps.pop_front();
            }
            LabStep::Body(data) => {
                let consumed = host.body_chunk(transfer.id, &data);
                debug_assert_eq!(consumed, data.len());
                transfer.script.steps.pop_front();
            }
            LabStep::ReadUpload(capacity) => {
                let mut buf = vec![0u8; capacity.max(1)];
                let n = host.body_read(transfer.id, &mut buf);
                transfer.uploaded += n;
                stats.total_uploaded += n;
                if n == 0 {
                    transfer.script.steps.pop_front();
                }
            }
            LabStep::Finish(code) => {
                if let Some(fd) = transfer.script.socket {
                    host.socket_interest(fd, SocketInterest::NONE, false)?;
                }
                finished.push((transfer.id, code));
                transfer.done = true;
                transfer.script.steps.pop_front();
            }
        }
        Ok(())
    }

    /// Advance every live transfer matching `filter` by one step.
    fn drive<F>(&mut self, host: &mut dyn EngineHost, filter: F) -> Result<()>
    where
        F: Fn(&LabTransfer) -> bool,
    {
        for transfer in self.active.iter_mut() {
            if !transfer.done && filter(transfer) {
                Self::advance(transfer, &mut self.finished, &mut self.stats, host)?;
            }
        }
        Ok(())
    }
}

impl TransferEngine for LabEngine {
    fn set_pipelining(&mut self, enabled: bool) {
        self.pipelining = enabled;
    }

    fn add_transfer(
        &mut self,
        id: TransferId,
        _options: TransferOptions,
        host: &mut dyn EngineHost,
    ) -> Result<MultiCode> {
        let script = self.next_script();
        match script.socket {
            Some(fd) => {
                host.socket_interest(
                    fd,
                    SocketInterest {
                        input: false,
                        output: true,
                    },
                    true,
                )?;
            }
            None => host.timer_request(0)?,
        }
        self.active.push(LabTransfer {
            id,
            script,
            uploaded: 0,
            done: false,
        });
        self.stats.adds += 1;
        self.stats.max_active = self.stats.max_active.max(self.live_count());
        Ok(MultiCode::OK)
    }

    fn remove_transfer(
        &mut self,
        id: TransferId,
        _host: &mut dyn EngineHost,
    ) -> Result<MultiCode> {
        self.active.retain(|t| t.id != id);
        self.stats.removes += 1;
        Ok(MultiCode::OK)
    }

    fn socket_action(
        &mut self,
        fd: RawFd,
        _input: bool,
        _output: bool,
        host: &mut dyn EngineHost,
    ) -> Result<MultiCode> {
        self.drive(host, |t| t.script.socket == Some(fd))?;
        Ok(MultiCode::OK)
    }

    fn timeout_action(&mut self, host: &mut dyn EngineHost) -> Result<MultiCode> {
        self.drive(host, |t| t.script.socket.is_none())?;
        let timer_work_left = self
            .active
            .iter()
            .any(|t| !t.done && t.script.socket.is_none());
        host.timer_request(if timer_work_left { 0 } else { -1 })?;
        Ok(MultiCode::OK)
    }

    fn drain_finished(&mut self, out: &mut Vec<(TransferId, TransferCode)>) {
        out.append(&mut self.finished);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Host that records everything and answers uploads from a fixed body.
    #[derive(Default)]
    struct ScriptHost {
        headers: Vec<Vec<u8>>,
        chunks: Vec<Vec<u8>>,
        upload_body: Vec<u8>,
        upload_offset: usize,
        timer_requests: Vec<i64>,
        interests: Vec<(RawFd, SocketInterest, bool)>,
    }

    impl EngineHost for ScriptHost {
        fn socket_interest(
            &mut self,
            fd: RawFd,
            interest: SocketInterest,
            is_new: bool,
        ) -> Result<()> {
            self.interests.push((fd, interest, is_new));
            Ok(())
        }
        fn timer_request(&mut self, timeout_ms: i64) -> Result<()> {
            self.timer_requests.push(timeout_ms);
            Ok(())
        }
        fn header_line(&mut self, _id: TransferId, line: &[u8]) -> Result<usize> {
            self.headers.push(line.to_vec());
            Ok(line.len())
        }
        fn body_chunk(&mut self, _id: TransferId, data: &[u8]) -> usize {
            self.chunks.push(data.to_vec());
            data.len()
        }
        fn body_read(&mut self, _id: TransferId, buf: &mut [u8]) -> usize {
            let remaining = self.upload_body.len() - self.upload_offset;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.upload_body[self.upload_offset..self.upload_offset + n]);
            self.upload_offset += n;
            n
        }
    }

    fn options() -> TransferOptions {
        TransferOptions {
            url: "http://h/x".into(),
            method: hfanout_core::method::Method::Get,
            headers: Vec::new(),
            body_len: 0,
            upload: false,
            post_fields: None,
            no_body: false,
            timeout_secs: None,
            buffer_size: 65536,
            ssl_verify: true,
            tcp_no_delay: false,
            verbose: false,
        }
    }

    #[test]
    fn test_script_runs_to_completion() {
        let mut engine = LabEngine::new();
        let mut host = ScriptHost::default();
        engine.push_script(LabScript::simple_ok(b"hi"));

        engine
            .add_transfer(TransferId(0), options(), &mut host)
            .unwrap();
        assert_eq!(host.timer_requests, vec![0]);

        // Drive until the engine stops asking for an immediate re-drive.
        loop {
            engine.timeout_action(&mut host).unwrap();
            if host.timer_requests.last() == Some(&-1) {
                break;
            }
        }

        assert_eq!(host.headers.len(), 3);
        assert_eq!(host.chunks, vec![b"hi".to_vec()]);

        let mut finished = Vec::new();
        engine.drain_finished(&mut finished);
        assert_eq!(finished, vec![(TransferId(0), TransferCode::OK)]);
    }

    #[test]
    fn test_read_upload_pulls_until_empty() {
        let mut engine = LabEngine::new();
        let mut host = ScriptHost {
            upload_body: vec![7u8; 2500],
            ..Default::default()
        };
        engine.push_script(
            LabScript::new()
                .read_upload(1000)
                .header("HTTP/1.1 200 OK\r\n")
                .finish(TransferCode::OK),
        );
        engine
            .add_transfer(TransferId(3), options(), &mut host)
            .unwrap();

        loop {
            engine.timeout_action(&mut host).unwrap();
            if host.timer_requests.last() == Some(&-1) {
                break;
            }
        }
        assert_eq!(engine.stats().total_uploaded, 2500);
        assert_eq!(host.upload_offset, 2500);
    }

    #[test]
    fn test_socket_script_waits_for_socket_action() {
        let mut engine = LabEngine::new();
        let mut host = ScriptHost::default();
        engine.push_script(LabScript::simple_ok(b"").over_socket(42));
        engine
            .add_transfer(TransferId(1), options(), &mut host)
            .unwrap();

        // Registered write interest, no timer involvement for this transfer.
        assert_eq!(host.interests.len(), 1);
        let (fd, interest, is_new) = host.interests[0];
        assert_eq!(fd, 42);
        assert!(interest.output && is_new);

        // Timer drives do nothing for socket-bound transfers.
        engine.timeout_action(&mut host).unwrap();
        assert!(host.headers.is_empty());

        for _ in 0..4 {
            engine.socket_action(42, false, true, &mut host).unwrap();
        }
        let mut finished = Vec::new();
        engine.drain_finished(&mut finished);
        assert_eq!(finished.len(), 1);
        // Interest dropped on finish.
        assert!(host.interests.last().unwrap().1.is_none());
    }

    #[test]
    fn test_max_active_tracking() {
        let mut engine = LabEngine::new();
        let mut host = ScriptHost::default();
        for i in 0..3 {
            engine
                .add_transfer(TransferId(i), options(), &mut host)
                .unwrap();
        }
        assert_eq!(engine.stats().max_active, 3);
    }
}
