//! # hfanout-engine — epoll-driven HTTP client engine
//!
//! Multiplexes many concurrent HTTP requests over a bounded pool of
//! connection slots, driven by a single-threaded reactor over epoll,
//! one eventfd wakeup signal, and one timerfd.
//!
//! # Architecture
//!
//! ```text
//!   caller (any thread)                     reactor thread
//!   ──────────────────                      ──────────────
//!   HttpClientHandle::enqueue ─► RequestQueue
//!                  └─► WakeupFd::signal ─► Epoller::wait_one
//!                                              │
//!                            ┌─────────────────┼──────────────────┐
//!                            ▼                 ▼                  ▼
//!                      wakeup fd           timer fd          socket fd
//!                   drain + admit     consume + timeout    socket_action
//!                            │             action                │
//!                            ▼                 └───────┬────────┘
//!                     ConnectionPool                   ▼
//!                   (LIFO slot reuse)          TransferEngine drive
//!                                                      │
//!                                              reap_completions
//!                                        on_done ► release ► signal
//! ```
//!
//! The transfer engine (wire I/O, TLS, DNS) lives behind
//! `hfanout_core::transfer::TransferEngine`; [`lab::LabEngine`] is the
//! in-tree deterministic implementation used by tests and demos.

pub mod connection;
pub mod lab;
pub mod pool;
pub mod queue;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod client;
        pub mod epoller;
        pub mod timer;
        pub mod wakeup;
    } else {
        compile_error!("hfanout-engine requires Linux (epoll, eventfd, timerfd)");
    }
}
