//! `WakeupFd` — eventfd-backed wakeup signal.
//!
//! Lets any thread interrupt the reactor's epoll wait when new work is
//! queued. Coalescing: multiple `signal()` calls before the reactor drains
//! collapse to a single wakeup (eventfd counter semantics).
//!
//! After `drain()`, the descriptor is not readable again until the next
//! `signal()`.

use crate::epoller::errno;
use hfanout_core::error::{ClientError, Result};

use std::os::unix::io::RawFd;

pub struct WakeupFd {
    fd: RawFd,
}

impl WakeupFd {
    pub fn new() -> Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(ClientError::Os(errno()));
        }
        Ok(Self { fd })
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Signal pending work. Callable from any thread.
    ///
    /// EAGAIN means the counter would overflow, which implies a signal is
    /// already pending. That's a coalesced success.
    pub fn signal(&self) -> Result<()> {
        let val: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd,
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let e = errno();
            if e == libc::EAGAIN {
                return Ok(());
            }
            return Err(ClientError::Os(e));
        }
        Ok(())
    }

    /// Consume all pending signals. Reactor thread only.
    ///
    /// Returns the number of coalesced signals consumed (0 when none were
    /// pending).
    pub fn drain(&self) -> u64 {
        let mut total = 0u64;
        loop {
            let mut buf = 0u64;
            let ret = unsafe {
                libc::read(
                    self.fd,
                    &mut buf as *mut u64 as *mut libc::c_void,
                    std::mem::size_of::<u64>(),
                )
            };
            if ret < 0 {
                // EAGAIN: fully drained. EINTR: retry.
                if errno() == libc::EINTR {
                    continue;
                }
                return total;
            }
            total += buf;
        }
    }
}

impl Drop for WakeupFd {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
            self.fd = -1;
        }
    }
}
