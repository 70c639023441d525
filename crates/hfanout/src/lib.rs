//! hfanout — asynchronous fan-out HTTP client engine.
//!
//! A single-threaded epoll reactor drives a multiplexing transfer engine
//! (the component that performs actual wire I/O) on behalf of many
//! concurrent requests. Capacity is a fixed pool of connection slots;
//! excess requests wait in a FIFO queue and are admitted as slots free up.
//! Submission is thread-safe through a cloneable handle; all response
//! delivery happens on the reactor thread via the [`HttpClientCallbacks`]
//! trait.
//!
//! ```no_run
//! use hfanout::{HttpClient, HttpClientConfig, HttpClientCallbacks};
//! use hfanout::{Method, Params, RequestContent, TransferError, HttpRequest};
//! use hfanout::LabEngine;
//! use std::sync::Arc;
//!
//! struct Print;
//! impl HttpClientCallbacks for Print {
//!     fn on_done(&self, request: &HttpRequest, error: TransferError) {
//!         println!("{} -> {}", request.url(), error);
//!     }
//! }
//!
//! let config = HttpClientConfig::new("http://localhost:8080").parallelism(8);
//! let mut client = HttpClient::new(config, LabEngine::new()).unwrap();
//! client.enqueue(
//!     Method::Get,
//!     "/status",
//!     Arc::new(Print),
//!     RequestContent::empty(),
//!     &Params::new(),
//!     Params::new(),
//!     Some(30),
//! );
//! client.run_until_idle().unwrap();
//! ```

pub use hfanout_core::callbacks::HttpClientCallbacks;
pub use hfanout_core::error::{ClientError, Result, TransferError};
pub use hfanout_core::method::Method;
pub use hfanout_core::request::{HttpRequest, Params, RequestContent};
pub use hfanout_core::transfer::{
    EngineHost, MultiCode, SocketInterest, TransferCode, TransferEngine, TransferId,
    TransferOptions,
};

pub use hfanout_engine::client::{HttpClient, HttpClientConfig, HttpClientHandle};
pub use hfanout_engine::lab::{LabEngine, LabScript, LabStats};
