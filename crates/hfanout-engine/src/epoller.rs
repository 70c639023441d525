//! `Epoller` — thin wrapper over Linux epoll.
//!
//! Register, modify and deregister descriptors with a {readable, writable}
//! interest mask, and block for exactly one ready event at a time.
//! Level-triggered; dispatch happens in the caller (`HttpClient`), which
//! switches on the returned descriptor.
//!
//! Registering an invalid or duplicate descriptor is a programming error:
//! debug builds assert, and the kernel's EBADF/EEXIST surfaces as a fatal
//! `ClientError::Os` either way. Interrupted waits (EINTR) are retried
//! transparently; every other wait failure is fatal.

use hfanout_core::error::{ClientError, Result};

use std::os::unix::io::RawFd;

/// Readiness interest for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    pub readable: bool,
    pub writable: bool,
}

impl Interest {
    pub const READABLE: Interest = Interest {
        readable: true,
        writable: false,
    };

    fn events(&self) -> u32 {
        let mut ev = 0u32;
        if self.readable {
            ev |= libc::EPOLLIN as u32;
        }
        if self.writable {
            ev |= libc::EPOLLOUT as u32;
        }
        ev
    }
}

/// One ready descriptor as reported by the kernel.
///
/// EPOLLERR/EPOLLHUP are folded into `readable` so the transfer engine gets
/// a chance to observe the failure through a read attempt.
#[derive(Debug, Clone, Copy)]
pub struct EpollEvent {
    pub fd: RawFd,
    pub readable: bool,
    pub writable: bool,
}

pub struct Epoller {
    epfd: RawFd,
}

impl Epoller {
    pub fn new() -> Result<Self> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(ClientError::Os(errno()));
        }
        Ok(Self { epfd })
    }

    /// Descriptor usable by an outer poll loop for embedding.
    pub fn select_fd(&self) -> RawFd {
        self.epfd
    }

    pub fn add_fd(&self, fd: RawFd, interest: Interest) -> Result<()> {
        debug_assert!(fd >= 0, "registering invalid fd {}", fd);
        self.ctl(libc::EPOLL_CTL_ADD, fd, interest.events())
    }

    pub fn modify_fd(&self, fd: RawFd, interest: Interest) -> Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, interest.events())
    }

    pub fn remove_fd(&self, fd: RawFd) -> Result<()> {
        self.ctl(libc::EPOLL_CTL_DEL, fd, 0)
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, events: u32) -> Result<()> {
        let mut ev = libc::epoll_event {
            events,
            u64: fd as u64,
        };
        let rc = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ev) };
        if rc < 0 {
            return Err(ClientError::Os(errno()));
        }
        Ok(())
    }

    /// Block until one registered descriptor is ready and return it.
    ///
    /// Retries on EINTR; any other wait failure is fatal.
    pub fn wait_one(&self) -> Result<EpollEvent> {
        loop {
            let mut ev = libc::epoll_event { events: 0, u64: 0 };
            let n = unsafe { libc::epoll_wait(self.epfd, &mut ev, 1, -1) };
            if n < 0 {
                let e = errno();
                if e == libc::EINTR {
                    continue;
                }
                return Err(ClientError::Os(e));
            }
            if n == 0 {
                continue;
            }
            let err = ev.events & (libc::EPOLLERR as u32 | libc::EPOLLHUP as u32) != 0;
            return Ok(EpollEvent {
                fd: ev.u64 as RawFd,
                readable: ev.events & libc::EPOLLIN as u32 != 0 || err,
                writable: ev.events & libc::EPOLLOUT as u32 != 0,
            });
        }
    }
}

impl Drop for Epoller {
    fn drop(&mut self) {
        if self.epfd >= 0 {
            unsafe {
                libc::close(self.epfd);
            }
            self.epfd = -1;
        }
    }
}

pub(crate) fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}
