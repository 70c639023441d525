//! hfanout End-to-End Smoke Test
//!
//! Tests the full client engine stack against the scripted lab engine:
//!   Part A — Construction: config validation, pipelining propagation
//!   Part B — Single exchange: status, headers, body, completion
//!   Part C — Fan-out: pool capacity cap, FIFO admission, slot recycling
//!   Part D — Protocol edges: 100-Continue suppression, PUT upload cursor,
//!            error-code translation
//!
//! Run: ./target/release/hfanout-smoke
//! (no network access needed; every transfer is scripted)

use hfanout::{
    HttpClient, HttpClientCallbacks, HttpClientConfig, HttpRequest, LabEngine, LabScript,
    Method, Params, RequestContent, TransferCode, TransferError,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

/// Callback recorder shared across requests.
#[derive(Default)]
struct Recorder {
    starts: Mutex<Vec<(String, u16)>>,
    body: Mutex<Vec<u8>>,
    done: Mutex<Vec<(String, TransferError)>>,
    done_count: AtomicUsize,
}

impl HttpClientCallbacks for Recorder {
    fn on_response_start(&self, request: &HttpRequest, _version: &str, code: u16) {
        self.starts
            .lock()
            .unwrap()
            .push((request.url().to_string(), code));
    }
    fn on_data(&self, _request: &HttpRequest, data: &[u8]) {
        self.body.lock().unwrap().extend_from_slice(data);
    }
    fn on_done(&self, request: &HttpRequest, error: TransferError) {
        self.done
            .lock()
            .unwrap()
            .push((request.url().to_string(), error));
        self.done_count.fetch_add(1, Ordering::SeqCst);
    }
}

fn enqueue_get(client: &HttpClient<LabEngine>, resource: &str, rec: &Arc<Recorder>) {
    client.enqueue(
        Method::Get,
        resource,
        Arc::clone(rec) as Arc<dyn HttpClientCallbacks>,
        RequestContent::empty(),
        &Params::new(),
        Params::new(),
        Some(30),
    );
}

// ════════════════════════════════════════════════════════════
// Part A: Construction
// ════════════════════════════════════════════════════════════

fn test_construction(t: &mut TestRunner) {
    t.section("Part A: Construction");

    let bounded = HttpClient::new(
        HttpClientConfig::new("http://smoke.test").queue_size(5),
        LabEngine::new(),
    );
    t.check(
        "nonzero queue_size rejected",
        bounded.is_err(),
        "construction unexpectedly succeeded",
    );

    let zero = HttpClient::new(
        HttpClientConfig::new("http://smoke.test").parallelism(0),
        LabEngine::new(),
    );
    t.check(
        "zero parallelism rejected",
        zero.is_err(),
        "construction unexpectedly succeeded",
    );

    match HttpClient::new(
        HttpClientConfig::new("http://smoke.test").pipelining(true),
        LabEngine::new(),
    ) {
        Ok(client) => {
            t.check(
                "pipelining propagated to engine",
                client.engine().pipelining(),
                "engine did not see pipelining toggle",
            );
            t.check(
                "select_fd usable for embedding",
                client.select_fd() >= 0,
                "negative epoll descriptor",
            );
        }
        Err(e) => t.fail("default construction", &e.to_string()),
    }
}

// ════════════════════════════════════════════════════════════
// Part B: Single exchange
// ════════════════════════════════════════════════════════════

fn test_single_exchange(t: &mut TestRunner) {
    t.section("Part B: Single exchange");

    let mut engine = LabEngine::new();
    engine.push_script(
        LabScript::new()
            .header("HTTP/1.1 200 OK\r\n")
            .header("Content-Type: text/plain\r\n")
            .header("\r\n")
            .body(b"hello, ")
            .body(b"world")
            .finish(TransferCode::OK),
    );
    let mut client = match HttpClient::new(
        HttpClientConfig::new("http://smoke.test").parallelism(4),
        engine,
    ) {
        Ok(c) => c,
        Err(e) => {
            t.fail("client construction", &e.to_string());
            return;
        }
    };

    let rec = Arc::new(Recorder::default());
    enqueue_get(&client, "/greeting", &rec);

    if let Err(e) = client.run_until_idle() {
        t.fail("run_until_idle", &e.to_string());
        return;
    }

    let starts = rec.starts.lock().unwrap();
    t.check(
        "response start delivered once",
        starts.len() == 1 && starts[0].1 == 200,
        &format!("starts: {:?}", starts),
    );
    drop(starts);

    let body = rec.body.lock().unwrap();
    t.check(
        "body chunks delivered in order",
        body.as_slice() == b"hello, world",
        &format!("body: {:?}", String::from_utf8_lossy(&body)),
    );
    drop(body);

    let done = rec.done.lock().unwrap();
    t.check(
        "completion delivered with no error",
        done.len() == 1 && done[0].1.is_none(),
        &format!("done: {:?}", done),
    );
    let first_url = done.first().map(|(url, _)| url.as_str()).unwrap_or("");
    t.check(
        "resource appended to base url",
        first_url == "http://smoke.test/greeting",
        first_url,
    );
}

// ════════════════════════════════════════════════════════════
// Part C: Fan-out
// ════════════════════════════════════════════════════════════

fn test_fanout(t: &mut TestRunner) {
    t.section("Part C: Fan-out");

    const N: usize = 25;
    const C: usize = 3;

    let mut engine = LabEngine::new();
    engine.set_default_script(LabScript::simple_ok(b"x"));
    let mut client = match HttpClient::new(
        HttpClientConfig::new("http://smoke.test").parallelism(C),
        engine,
    ) {
        Ok(c) => c,
        Err(e) => {
            t.fail("client construction", &e.to_string());
            return;
        }
    };

    let rec = Arc::new(Recorder::default());
    let handle = client.handle();
    let submit_rec = Arc::clone(&rec);
    let submitter = std::thread::spawn(move || {
        for i in 0..N {
            handle.enqueue(
                Method::Get,
                &format!("/item/{}", i),
                Arc::clone(&submit_rec) as Arc<dyn HttpClientCallbacks>,
                RequestContent::empty(),
                &Params::new(),
                Params::new(),
                None,
            );
        }
    });
    if submitter.join().is_err() {
        t.fail("cross-thread submission", "submitter thread panicked");
        return;
    }

    if let Err(e) = client.run_until_idle() {
        t.fail("run_until_idle", &e.to_string());
        return;
    }

    t.check(
        "every request completed exactly once",
        rec.done_count.load(Ordering::SeqCst) == N,
        &format!("done: {}", rec.done_count.load(Ordering::SeqCst)),
    );
    let stats = client.engine().stats();
    t.check(
        "concurrent transfers capped at pool capacity",
        stats.max_active <= C,
        &format!("max_active: {}", stats.max_active),
    );
    t.check(
        "every transfer deregistered",
        stats.adds == N && stats.removes == N,
        &format!("adds: {} removes: {}", stats.adds, stats.removes),
    );

    let done = rec.done.lock().unwrap();
    let fifo = done
        .iter()
        .enumerate()
        .all(|(i, (url, _))| url == &format!("http://smoke.test/item/{}", i));
    t.check("FIFO admission order", fifo, "completions out of order");
}

// ════════════════════════════════════════════════════════════
// Part D: Protocol edges
// ════════════════════════════════════════════════════════════

fn test_protocol_edges(t: &mut TestRunner) {
    t.section("Part D: Protocol edges");

    // 100-Continue preamble must not reach the consumer.
    let mut engine = LabEngine::new();
    engine.push_script(
        LabScript::new()
            .header("HTTP/1.1 100 Continue\r\n")
            .header("\r\n")
            .header("HTTP/1.1 201 Created\r\n")
            .header("\r\n")
            .finish(TransferCode::OK),
    );
    // PUT upload pulled in chunks until the body is exhausted.
    engine.push_script(
        LabScript::new()
            .read_upload(4096)
            .header("HTTP/1.1 200 OK\r\n")
            .finish(TransferCode::OK),
    );
    // Engine-native failure codes.
    engine.push_script(LabScript::new().finish(TransferCode::OPERATION_TIMEDOUT));
    engine.push_script(LabScript::new().finish(TransferCode::COULDNT_RESOLVE_HOST));
    engine.push_script(LabScript::new().finish(TransferCode(4242)));

    let mut client = match HttpClient::new(
        HttpClientConfig::new("http://smoke.test").parallelism(1),
        engine,
    ) {
        Ok(c) => c,
        Err(e) => {
            t.fail("client construction", &e.to_string());
            return;
        }
    };

    let rec = Arc::new(Recorder::default());
    let upload = vec![0x5au8; 100_000];
    client.enqueue(
        Method::Put,
        "/continue",
        Arc::clone(&rec) as Arc<dyn HttpClientCallbacks>,
        RequestContent::new(b"small".to_vec(), "text/plain"),
        &Params::new(),
        Params::new(),
        None,
    );
    client.enqueue(
        Method::Put,
        "/upload",
        Arc::clone(&rec) as Arc<dyn HttpClientCallbacks>,
        RequestContent::new(upload, "application/octet-stream"),
        &Params::new(),
        Params::new(),
        None,
    );
    for resource in ["/timeout", "/nohost", "/weird"] {
        enqueue_get(&client, resource, &rec);
    }

    if let Err(e) = client.run_until_idle() {
        t.fail("run_until_idle", &e.to_string());
        return;
    }

    let starts = rec.starts.lock().unwrap();
    let continue_starts: Vec<&(String, u16)> = starts
        .iter()
        .filter(|(url, _)| url.ends_with("/continue"))
        .collect();
    t.check(
        "100-Continue preamble suppressed",
        continue_starts.len() == 1 && continue_starts[0].1 == 201,
        &format!("starts: {:?}", continue_starts),
    );
    drop(starts);

    t.check(
        "PUT body fully uploaded",
        client.engine().stats().total_uploaded == 100_000,
        &format!("uploaded: {}", client.engine().stats().total_uploaded),
    );

    let done = rec.done.lock().unwrap();
    let outcome = |suffix: &str| {
        done.iter()
            .find(|(url, _)| url.ends_with(suffix))
            .map(|(_, e)| *e)
    };
    t.check(
        "timeout code translated",
        outcome("/timeout") == Some(TransferError::Timeout),
        &format!("{:?}", outcome("/timeout")),
    );
    t.check(
        "resolve failure translated",
        outcome("/nohost") == Some(TransferError::HostNotFound),
        &format!("{:?}", outcome("/nohost")),
    );
    t.check(
        "out-of-set code maps to Unknown",
        outcome("/weird") == Some(TransferError::Unknown),
        &format!("{:?}", outcome("/weird")),
    );
}

fn main() {
    env_logger::init();

    let mut t = TestRunner::new();
    test_construction(&mut t);
    test_single_exchange(&mut t);
    test_fanout(&mut t);
    test_protocol_edges(&mut t);
    t.summary();

    if t.failed > 0 {
        std::process::exit(1);
    }
}
