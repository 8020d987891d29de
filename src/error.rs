use std::io;

use nix::errno::Errno;

use crate::tracer::{Boundary, Pid, Restart, State};


pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No such process: {pid}")]
    NoSuchProcess { pid: Pid },

    #[error("Process is already traced")]
    AlreadyTraced,

    #[error("Tracee = {pid} is not stopped (state = {state:?})")]
    NotStopped { pid: Pid, state: State },

    #[error("Tracee = {pid} reported a syscall {found:?} stop, expected {expected:?}")]
    ProtocolDesync { pid: Pid, expected: Boundary, found: Boundary },

    #[error("Invalid address {addr:#x} in tracee = {pid}")]
    InvalidAddress { pid: Pid, addr: u64 },

    #[error("Short read at {addr:#x}: requested {requested} bytes, read {read}")]
    ShortRead { addr: u64, requested: usize, read: usize },

    #[error("No NUL terminator within {max} bytes of {addr:#x}")]
    StringTooLong { addr: u64, max: usize },

    #[error("Argument index {index} out of range, maximum is {max}")]
    ArgumentIndexOutOfRange { index: usize, max: usize },

    #[error("Wait interrupted by a signal")]
    Interrupted,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Could not attach to tracee = {pid}")]
    Attach {
        pid: Pid,
        source: nix::Error,
    },

    #[error("Could not restart tracee = {pid} with mode = {mode:?}")]
    Restart { pid: Pid, mode: Restart, source: nix::Error },

    #[error("Input/output error")]
    IO(#[from] io::Error),

    #[error("OS error")]
    OS(#[from] nix::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Return `true` if the failed call may simply be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// Return `true` if the error means the tracee no longer exists.
    pub fn tracee_died(&self) -> bool {
        match self {
            Error::NoSuchProcess { .. } => true,
            Error::Restart { source, .. } => *source == Errno::ESRCH,
            _ => false,
        }
    }
}

pub(crate) trait ResultExt<T> {
    /// Map `ESRCH` from a ptrace request on `pid` to [`Error::NoSuchProcess`].
    fn died_if_esrch(self, pid: Pid) -> Result<T>;

    /// Like [`died_if_esrch()`](ResultExt::died_if_esrch), but also map memory faults
    /// at `addr` to [`Error::InvalidAddress`].
    fn faulted_at(self, pid: Pid, addr: u64) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, nix::Error> {
    fn died_if_esrch(self, pid: Pid) -> Result<T> {
        self.map_err(|errno| match errno {
            Errno::ESRCH => Error::NoSuchProcess { pid },
            errno => Error::OS(errno),
        })
    }

    fn faulted_at(self, pid: Pid, addr: u64) -> Result<T> {
        self.map_err(|errno| match errno {
            Errno::ESRCH => Error::NoSuchProcess { pid },
            Errno::EIO | Errno::EFAULT => Error::InvalidAddress { pid, addr },
            errno => Error::OS(errno),
        })
    }
}

macro_rules! internal_error {
    ($msg: literal) => {
        return Err($crate::error::Error::Internal($msg.into()))
    };
    ($fmt: literal, $($arg: tt)*) => {
        return Err($crate::error::Error::Internal(format!($fmt, $($arg)*)))
    };
}
