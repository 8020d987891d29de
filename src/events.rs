//! A stream of syscall and lifecycle events of one tracee.

use nix::sys::signal::Signal;
use tracing::debug;

use crate::error::Result;
use crate::syscalls::SyscallInfo;
use crate::tracer::{Pid, StopEvent, Tracer};

/// One stop of the tracee, with the syscall it is stopped in, if any.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    pub pid: Pid,
    pub stop: StopEvent,
    pub syscall: Option<SyscallInfo>,
}

/// Drive a [`Tracer`] from syscall boundary to syscall boundary.
///
/// Between events, the tracee is stopped, and can be inspected and modified via
/// [`tracer()`](EventStream::tracer) and [`tracer_mut()`](EventStream::tracer_mut).
#[derive(Debug)]
pub struct EventStream {
    tracer: Tracer,

    // Signal of the last signal-delivery-stop, delivered on the next resume.
    pending: Option<Signal>,

    // Whether the initial `SIGSTOP` has been seen.
    started: bool,

    done: bool,
}

impl EventStream {
    pub fn new(tracer: Tracer) -> Self {
        // A tracee that is already stopped has been waited on by the caller.
        let started = tracer.is_stopped();

        Self {
            tracer,
            pending: None,
            started,
            done: false,
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tracer {
        &mut self.tracer
    }

    pub fn into_inner(self) -> Tracer {
        self.tracer
    }

    /// Resume the tracee and return its next event, or `None` once it has exited.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        let res = self.advance();

        if let Err(err) = &res {
            if err.tracee_died() {
                self.done = true;
            }
        }

        res
    }

    fn advance(&mut self) -> Result<Option<Event>> {
        loop {
            if self.done {
                return Ok(None);
            }

            if self.tracer.is_stopped() {
                let signal = self.pending.take();
                self.tracer.syscall(signal)?;
            }

            let stop = self.tracer.wait()?;
            let pid = self.tracer.pid();

            match stop {
                StopEvent::Signaled(Signal::SIGSTOP) if !self.started => {
                    debug!(pid = pid.as_raw(), "suppressing initial SIGSTOP");
                    self.started = true;
                    continue;
                },
                StopEvent::Signaled(signal) => {
                    self.pending = Some(signal);
                },
                StopEvent::Exited(_) | StopEvent::Killed { .. } => {
                    self.done = true;
                },
                _ => {},
            }

            self.started = true;

            let syscall = match stop {
                StopEvent::SyscallEntry | StopEvent::SyscallExit => {
                    Some(self.tracer.syscall_info()?)
                },
                _ => None,
            };

            return Ok(Some(Event { pid, stop, syscall }));
        }
    }
}

impl Iterator for EventStream {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
