//! The trace controller: attach, stop, resume and detach a single traced process.

use std::convert::TryFrom;

use nix::{
    errno::Errno,
    sys::{
        ptrace,
        signal::{self, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
};
use tracing::{debug, info, trace, warn};

use crate::cmd::{self, Command};
use crate::error::{Error, Result, ResultExt};

pub use nix::unistd::Pid;
pub use nix::sys::ptrace::Options;

/// Linux request code defined in `include/uapi/linux/ptrace.h`, since 5.3.
const PTRACE_GET_SYSCALL_INFO: u32 = 0x420e;

const PTRACE_SYSCALL_INFO_ENTRY: u8 = 1;
const PTRACE_SYSCALL_INFO_EXIT: u8 = 2;
const PTRACE_SYSCALL_INFO_SECCOMP: u8 = 3;

/// Options required for internal tracee state management.
/// These are:
/// - [`PTRACE_O_TRACESYSGOOD`](Options::PTRACE_O_TRACESYSGOOD), to tell syscall-stops
///   apart from a delivered `SIGTRAP`
/// - [`PTRACE_O_TRACEEXEC`](Options::PTRACE_O_TRACEEXEC), so a successful `execve()`
///   is an event, not a stray `SIGTRAP`
pub const REQUIRED_OPTIONS: Options = Options::empty()
    .union(Options::PTRACE_O_TRACESYSGOOD)
    .union(Options::PTRACE_O_TRACEEXEC);

pub const DEFAULT_OPTIONS: Options = REQUIRED_OPTIONS;

/// Lifecycle state of a traced process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Running,
    StoppedAtEntry,
    StoppedAtExit,

    /// Stopped by a signal, including the `SIGTRAP` of a ptrace-event-stop.
    Stopped(Signal),

    Exited,
}

impl State {
    pub fn is_stopped(&self) -> bool {
        matches!(self, State::StoppedAtEntry | State::StoppedAtExit | State::Stopped(_))
    }
}

/// Which side of a syscall a syscall-stop is on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Boundary {
    Entry,
    Exit,
}

impl Boundary {
    fn next(self) -> Self {
        match self {
            Boundary::Entry => Boundary::Exit,
            Boundary::Exit => Boundary::Entry,
        }
    }
}

/// One observed change of the traced process, as reported by `wait(2)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopEvent {
    SyscallEntry,
    SyscallExit,

    // signal-delivery-stop or group-stop
    Signaled(Signal),

    // ptrace-event-stop
    Event(PtraceEvent),

    Exited(i32),
    Killed {
        signal: Signal,
        core_dumped: bool,
    },
}

impl StopEvent {
    /// Return `true` if the traced process is gone after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StopEvent::Exited(_) | StopEvent::Killed { .. })
    }
}

/// Ptrace-event-stops, only reported when the matching [`Options`] are set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PtraceEvent {
    Clone { new: Pid },
    Fork { new: Pid },
    Vfork { new: Pid },
    VforkDone { new: Pid },
    Exec { old: Pid },
    Exiting { exit_code: i32 },
    Signaling {
        signal: Signal,
        core_dumped: bool,
    },
    Seccomp { data: u16 },
}

/// Restart requests, which resume stopped tracees.
///
/// The restart mode determines the possible subsequent stops of the restarted tracee.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Restart {
    Step,
    Continue,
    Syscall,
}

/// A failed [`Tracer::detach()`].
#[derive(Debug, thiserror::Error)]
#[error("Could not detach from tracee = {}", .tracer.pid)]
pub struct DetachError {
    /// The tracer, still in control of the tracee.
    pub tracer: Tracer,

    #[source]
    pub error: Error,
}

impl From<DetachError> for Error {
    fn from(err: DetachError) -> Self {
        err.error
    }
}

/// Request tracing of the calling process by its parent.
///
/// Meant to be called in a freshly forked child, before it raises `SIGSTOP` or execs.
pub fn trace_me() -> Result<()> {
    match ptrace::traceme() {
        Ok(()) => Ok(()),
        Err(Errno::EPERM) => Err(Error::AlreadyTraced),
        Err(errno) => Err(errno.into()),
    }
}

/// Controller for one traced process.
///
/// The protocol is strictly alternating: each resume ([`syscall()`](Tracer::syscall),
/// [`restart()`](Tracer::restart)) must be followed by a [`wait()`](Tracer::wait) before
/// the tracee can be inspected or resumed again.
///
/// Ptrace requests must be issued from the thread that is the tracer of `pid`.
#[derive(Debug, Eq, PartialEq)]
pub struct Tracer {
    pid: Pid,
    state: State,

    /// Kind of the next syscall-stop, if the tracee is resumed with `PTRACE_SYSCALL`.
    next_boundary: Boundary,

    /// Ptrace options applied at the first observed stop.
    options: Options,

    options_applied: bool,
}

impl Tracer {
    /// Control `pid`, a child which has called [`trace_me()`] and will stop on its own.
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            state: State::Running,
            next_boundary: Boundary::Entry,
            options: DEFAULT_OPTIONS,
            options_applied: false,
        }
    }

    /// Attach to a running process. This will deliver a `SIGSTOP`.
    ///
    /// **Warning:** the tracee is not considered stopped until it has been seen to stop
    /// via [`wait()`](Tracer::wait).
    pub fn attach(pid: Pid) -> Result<Self> {
        ptrace::attach(pid).map_err(|source| Error::Attach { pid, source })?;

        info!(pid = pid.as_raw(), "attached to tracee");

        Ok(Self::new(pid))
    }

    /// Fork and exec `cmd` as a tracee.
    pub fn spawn(cmd: Command) -> Result<Self> {
        let pid = cmd.fork_exec()?;

        info!(pid = pid.as_raw(), "spawned tracee");

        Ok(Self::new(pid))
    }

    /// Fork a tracee which runs `f`, then exits with its return value.
    pub fn fork<F>(f: F) -> Result<Self>
    where
        F: FnOnce() -> i32,
    {
        let pid = cmd::fork_call(f)?;

        info!(pid = pid.as_raw(), "forked tracee");

        Ok(Self::new(pid))
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// Return the ptrace options applied at the first stop.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Set the ptrace options of the tracee.
    ///
    /// **NOTE:** [`REQUIRED_OPTIONS`] are always set, even if unset in the passed value.
    ///
    /// If the tracee is stopped, the options take effect immediately. Otherwise they are
    /// applied at the next stop.
    pub fn set_options(&mut self, options: Options) -> Result<()> {
        self.options = options | REQUIRED_OPTIONS;

        if self.is_stopped() {
            ptrace::setoptions(self.pid, self.options).died_if_esrch(self.pid)?;
            self.options_applied = true;
        } else {
            self.options_applied = false;
        }

        Ok(())
    }

    /// Fail with [`Error::NotStopped`] unless the tracee is in a stop state.
    pub(crate) fn ensure_stopped(&self) -> Result<()> {
        match self.state {
            State::Exited => Err(Error::NoSuchProcess { pid: self.pid }),
            state if state.is_stopped() => Ok(()),
            state => Err(Error::NotStopped { pid: self.pid, state }),
        }
    }

    /// Resume the stopped tracee until its next syscall boundary, delivering `signal`.
    ///
    /// Does not wait: the next call to [`wait()`](Tracer::wait) observes the result.
    pub fn syscall(&mut self, signal: impl Into<Option<Signal>>) -> Result<()> {
        self.restart(Restart::Syscall, signal)
    }

    /// Resume the stopped tracee, delivering `signal`.
    pub fn restart(&mut self, mode: Restart, signal: impl Into<Option<Signal>>) -> Result<()> {
        self.ensure_stopped()?;

        let pid = self.pid;
        let signal = signal.into();

        let res = match mode {
            Restart::Step =>
                ptrace::step(pid, signal),
            Restart::Continue =>
                ptrace::cont(pid, signal),
            Restart::Syscall =>
                ptrace::syscall(pid, signal),
        };

        res.map_err(|source| match source {
            Errno::ESRCH => Error::NoSuchProcess { pid },
            source => Error::Restart { pid, mode, source },
        })?;

        // Without `PTRACE_SYSCALL`, a pending syscall-exit-stop is never reported.
        if mode != Restart::Syscall && self.next_boundary == Boundary::Exit {
            self.next_boundary = Boundary::Entry;
        }

        trace!(pid = pid.as_raw(), ?mode, ?signal, "restarted tracee");
        self.set_state(State::Running);

        Ok(())
    }

    /// Detach from the stopped tracee, delivering `signal`, and let it run untraced.
    ///
    /// On failure the tracer is handed back in the [`DetachError`], since the tracee may
    /// still be attached.
    pub fn detach(self, signal: impl Into<Option<Signal>>) -> std::result::Result<(), DetachError> {
        if let Err(error) = self.ensure_stopped() {
            return Err(DetachError { tracer: self, error });
        }

        if let Err(error) = ptrace::detach(self.pid, signal).died_if_esrch(self.pid) {
            return Err(DetachError { tracer: self, error });
        }

        info!(pid = self.pid.as_raw(), "detached from tracee");

        Ok(())
    }

    /// Kill the tracee with `SIGKILL`.
    ///
    /// Killing a tracee which has already exited is not an error, since exit and kill race.
    /// The termination is reported by the next [`wait()`](Tracer::wait).
    pub fn kill(&mut self) -> Result<()> {
        if self.state == State::Exited {
            debug!(pid = self.pid.as_raw(), "tracee already exited, nothing to kill");
            return Ok(());
        }

        match signal::kill(self.pid, Signal::SIGKILL) {
            Ok(()) => {
                info!(pid = self.pid.as_raw(), "killed tracee");
                Ok(())
            },
            Err(Errno::ESRCH) => {
                warn!(pid = self.pid.as_raw(), "tracee vanished before kill");
                Ok(())
            },
            Err(errno) => Err(errno.into()),
        }
    }

    /// Block until the tracee stops, exits, or is killed.
    pub fn wait(&mut self) -> Result<StopEvent> {
        match self.wait_with(WaitPidFlag::__WALL)? {
            Some(event) => Ok(event),
            None => internal_error!("blocking wait returned no status"),
        }
    }

    /// Like [`wait()`](Tracer::wait), but return `None` if the tracee has not changed state.
    pub fn poll(&mut self) -> Result<Option<StopEvent>> {
        self.wait_with(WaitPidFlag::__WALL | WaitPidFlag::WNOHANG)
    }

    fn wait_with(&mut self, flags: WaitPidFlag) -> Result<Option<StopEvent>> {
        let pid = self.pid;

        if self.state == State::Exited {
            return Err(Error::NoSuchProcess { pid });
        }

        let status = match wait::waitpid(pid, Some(flags)) {
            Ok(WaitStatus::StillAlive) => return Ok(None),
            Ok(status) => status,
            Err(Errno::EINTR) => return Err(Error::Interrupted),
            Err(Errno::ECHILD) | Err(Errno::ESRCH) => return Err(Error::NoSuchProcess { pid }),
            Err(errno) => return Err(errno.into()),
        };

        trace!(pid = pid.as_raw(), ?status, "wait status");

        self.observe(status).map(Some)
    }

    // Interpret a `wait(2)` status of our tracee, updating the tracee state.
    fn observe(&mut self, status: WaitStatus) -> Result<StopEvent> {
        let event = match status {
            WaitStatus::Exited(_pid, exit_code) => {
                self.set_state(State::Exited);
                StopEvent::Exited(exit_code)
            },
            WaitStatus::Signaled(_pid, signal, core_dumped) => {
                self.set_state(State::Exited);
                StopEvent::Killed { signal, core_dumped }
            },
            WaitStatus::Stopped(_pid, signal) => {
                self.apply_options()?;
                self.set_state(State::Stopped(signal));

                // A signal-delivery-stop never happens between syscall-enter-stop and
                // syscall-exit-stop, so the expected boundary is left alone.
                StopEvent::Signaled(signal)
            },
            WaitStatus::PtraceEvent(pid, signal, code) => {
                self.apply_options()?;
                let event = self.ptrace_event(pid, code)?;
                self.set_state(State::Stopped(signal));
                StopEvent::Event(event)
            },
            // From the manual:
            //
            //     Syscall-enter-stop and syscall-exit-stop are indistinguishable from
            //     each other by the tracer.  The tracer needs to keep track of the
            //     sequence of ptrace-stops in order to not misinterpret syscall-enter-
            //     stop as syscall-exit-stop or vice versa.
            //
            WaitStatus::PtraceSyscall(pid) => {
                let expected = self.next_boundary;
                let reported = kernel_boundary(pid);

                let boundary = reported.unwrap_or(expected);
                self.next_boundary = boundary.next();

                match boundary {
                    Boundary::Entry => self.set_state(State::StoppedAtEntry),
                    Boundary::Exit => self.set_state(State::StoppedAtExit),
                }

                check_boundary(pid, expected, reported)?;

                match boundary {
                    Boundary::Entry => StopEvent::SyscallEntry,
                    Boundary::Exit => StopEvent::SyscallExit,
                }
            },
            // Assume `!WCONTINUED`.
            WaitStatus::Continued(_) |
            WaitStatus::StillAlive =>
                internal_error!("unreachable `wait()` status"),
        };

        Ok(event)
    }

    fn ptrace_event(&mut self, pid: Pid, code: i32) -> Result<PtraceEvent> {
        let event = match code {
            libc::PTRACE_EVENT_FORK => {
                let new = event_pid(pid)?;
                PtraceEvent::Fork { new }
            },
            libc::PTRACE_EVENT_VFORK => {
                let new = event_pid(pid)?;
                PtraceEvent::Vfork { new }
            },
            libc::PTRACE_EVENT_CLONE => {
                let new = event_pid(pid)?;
                PtraceEvent::Clone { new }
            },
            libc::PTRACE_EVENT_VFORK_DONE => {
                let new = event_pid(pid)?;
                PtraceEvent::VforkDone { new }
            },
            libc::PTRACE_EVENT_EXEC => {
                // The current `pid` is the tgid. If a non-leader thread exec'd, `old` is its
                // former tid.
                let old = event_pid(pid)?;

                // We know we are in `execve()`. Make sure we correctly label the next
                // syscall-stop as an exit-stop.
                self.next_boundary = Boundary::Exit;

                PtraceEvent::Exec { old }
            },
            libc::PTRACE_EVENT_EXIT => {
                // In this context, `PTRACE_GETEVENTMSG` returns the pending wait status
                // as an `unsigned long`. We are only interested in the low 16-bit word.
                let status = ptrace::getevent(pid).died_if_esrch(pid)? as u16;

                match ExitType::parse(status)? {
                    ExitType::Exit(exit_code) =>
                        PtraceEvent::Exiting { exit_code },
                    ExitType::Signaled(signal, core_dumped) =>
                        PtraceEvent::Signaling { signal, core_dumped },
                }
            },
            libc::PTRACE_EVENT_SECCOMP => {
                // `SECCOMP_RET_DATA`, which is the low 16 bits of an int.
                let data = ptrace::getevent(pid).died_if_esrch(pid)? as u16;

                // A seccomp-stop stands in for the syscall-enter-stop.
                self.next_boundary = Boundary::Exit;

                PtraceEvent::Seccomp { data }
            },
            code => {
                // `PTRACE_EVENT_STOP` is only reported after `PTRACE_SEIZE`, which we do not use.
                internal_error!("unexpected ptrace-event-stop code = {}", code)
            },
        };

        Ok(event)
    }

    fn apply_options(&mut self) -> Result<()> {
        if !self.options_applied {
            debug!(pid = self.pid.as_raw(), options = ?self.options, "setting tracee options");

            ptrace::setoptions(self.pid, self.options).died_if_esrch(self.pid)?;
            self.options_applied = true;
        }

        Ok(())
    }

    fn set_state(&mut self, state: State) {
        trace!(pid = self.pid.as_raw(), ?state, "setting tracee state");

        self.state = state;
    }
}

fn event_pid(pid: Pid) -> Result<Pid> {
    let data = ptrace::getevent(pid).died_if_esrch(pid)?;
    Ok(Pid::from_raw(data as u32 as i32))
}

// Compare the boundary we expected against the one the kernel reported, if any.
fn check_boundary(pid: Pid, expected: Boundary, reported: Option<Boundary>) -> Result<()> {
    match reported {
        Some(found) if found != expected => {
            warn!(pid = pid.as_raw(), ?expected, ?found, "syscall-stop desync");
            Err(Error::ProtocolDesync { pid, expected, found })
        },
        _ => Ok(()),
    }
}

/// Leading, fixed part of `struct ptrace_syscall_info`.
#[repr(C)]
#[derive(Default)]
struct SyscallInfoHeader {
    op: u8,
    pad: [u8; 3],
    arch: u32,
    instruction_pointer: u64,
    stack_pointer: u64,
}

// Ask the kernel which boundary the syscall-stopped tracee is at. `None` if the kernel
// predates `PTRACE_GET_SYSCALL_INFO`, or the stop is not a syscall-stop.
fn kernel_boundary(pid: Pid) -> Option<Boundary> {
    let mut info = SyscallInfoHeader::default();

    // SAFETY: the kernel writes at most `size_of::<SyscallInfoHeader>()` bytes to `info`.
    let res = unsafe {
        libc::ptrace(
            PTRACE_GET_SYSCALL_INFO as _,
            pid.as_raw(),
            std::mem::size_of::<SyscallInfoHeader>(),
            &mut info as *mut SyscallInfoHeader as *mut libc::c_void,
        )
    };

    if res <= 0 {
        return None;
    }

    match info.op {
        PTRACE_SYSCALL_INFO_ENTRY | PTRACE_SYSCALL_INFO_SECCOMP => Some(Boundary::Entry),
        PTRACE_SYSCALL_INFO_EXIT => Some(Boundary::Exit),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ExitType {
    Exit(i32),
    Signaled(Signal, bool),
}

impl ExitType {
    fn parse(status: u16) -> Result<Self> {
        // The bit layout of the word `status` is:
        //
        //   15                         8   7                     0
        //    +-------------------------+---+---------------------+
        //    |        exit_code        | c |       sig_no        |
        //    +-------------------------+---+---------------------+
        //
        // If `status[6:0]` is nonzero, then `pid` is being signaled with `sig_no`,
        // and a set `status[7]` bit flags a core dump. Otherwise, it is a normal
        // exit with exit code `status[15:8]`.
        let sig_no = status & 0x7f;

        let ty = if sig_no == 0 {
            // Extract, zero-extend, cast.
            let exit_code = (status >> 8) as u8 as u32 as i32;

            ExitType::Exit(exit_code)
        } else {
            let core_dumped = status & (1 << 7) != 0;
            let signal = Signal::try_from(sig_no as i32)?;

            ExitType::Signaled(signal, core_dumped)
        };

        Ok(ty)
    }
}
