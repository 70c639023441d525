//! `TimerFd` — one-shot monotonic timer.
//!
//! One timer exists per engine instance, armed exclusively on behalf of the
//! transfer engine's scheduling requests. Re-arming replaces any prior
//! deadline.
//!
//! `arm(0)` and `arm(-1)` both disarm the descriptor: a zero timeout means
//! "drive the engine again immediately", which the adapter performs
//! synchronously instead of taking a trip through the kernel.

use crate::epoller::errno;
use hfanout_core::error::{ClientError, Result};

use std::os::unix::io::RawFd;

pub struct TimerFd {
    fd: RawFd,
}

impl TimerFd {
    pub fn new() -> Result<Self> {
        let fd = unsafe {
            libc::timerfd_create(
                libc::CLOCK_MONOTONIC,
                libc::TFD_NONBLOCK | libc::TFD_CLOEXEC,
            )
        };
        if fd < 0 {
            return Err(ClientError::Os(errno()));
        }
        Ok(Self { fd })
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Arm a one-shot relative deadline `ms` milliseconds out, replacing any
    /// prior deadline. `0` and `-1` disarm.
    pub fn arm(&self, ms: i64) -> Result<()> {
        let zero = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let value = if ms > 0 {
            libc::timespec {
                tv_sec: (ms / 1000) as libc::time_t,
                tv_nsec: ((ms % 1000) * 1_000_000) as libc::c_long,
            }
        } else {
            zero
        };
        let spec = libc::itimerspec {
            it_interval: zero,
            it_value: value,
        };
        let rc = unsafe { libc::timerfd_settime(self.fd, 0, &spec, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(ClientError::Os(errno()));
        }
        Ok(())
    }

    /// Read the expiration counter, clearing the descriptor's readiness
    /// edge. Returns 0 when the timer has not fired since the last read.
    pub fn consume_expirations(&self) -> u64 {
        let mut buf = 0u64;
        let ret = unsafe {
            libc::read(
                self.fd,
                &mut buf as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            return 0;
        }
        buf
    }
}

impl Drop for TimerFd {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
            self.fd = -1;
        }
    }
}
