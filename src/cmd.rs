use std::ffi::{CString, NulError};

use nix::{
    sys::signal::{raise, Signal},
    unistd::{fork, ForkResult, Pid},
};

use crate::error::Error;
use crate::tracer::trace_me;

/// Exit code of a forked tracee which could not set itself up for tracing.
pub const EXIT_SETUP_FAILED: i32 = 126;

/// Exit code of a forked tracee whose `execv()` failed.
pub const EXIT_EXEC_FAILED: i32 = 127;


/// Command to spawn as a child process to be traced.
#[derive(Clone, Debug)]
pub struct Command {
    /// Argument vector to pass to `execv()`.
    argv: Vec<CString>,
}

impl Command {
    pub fn new(argv: Vec<impl Into<Vec<u8>>>) -> Result<Self, NulError> {
        if argv.is_empty() {
            panic!("Command exe required");
        }

        // Ensure we own NUL-terminated strings to for the foreign exec call.
        //
        // We're heap-allocating, so always do this before forking.
        let argv: Result<Vec<_>, _> = argv
            .into_iter()
            .map(CString::new)
            .collect();
        let argv = argv?;

        Ok(Self { argv })
    }

    /// Fork and exec a child process determined by `self.argv`.
    ///
    /// The child process will set itself as a tracee of the parent, then raise `SIGSTOP`
    /// so the parent can resume and observe it without a race.
    pub fn fork_exec(self) -> Result<Pid, Error> {
        // Heap-allocates, must occur pre-fork.
        let argv = self.argv();

        // SAFETY: the child only makes async-signal-safe calls before `execv()`.
        match unsafe { fork() }? {
            ForkResult::Child => {
                become_tracee();

                // Use unsafe `libc::execv`, because the `nix` wrapper heap- allocates a
                // `Vec` internally, which is not async-signal-safe.
                unsafe {
                    libc::execv(argv[0], argv.as_ptr());
                    libc::_exit(EXIT_EXEC_FAILED);
                }
            },
            ForkResult::Parent { child } => {
                Ok(child)
            },
        }
    }

    // Construct NUL-terminated arguments for `execv`. We heap-allocate to return a `Vec`,
    // and so must do this before calling `fork()`.
    fn argv(&self) -> Vec<*const libc::c_char> {
        let mut argv: Vec<_> = self.argv
            .iter()
            .map(|s| s.as_ptr())
            .collect();
        argv.push(std::ptr::null());
        argv
    }
}

/// Fork a child which requests tracing, stops itself, then runs `f` and exits with its
/// return value.
///
/// `f` runs in a copy of the parent's address space after `fork()`, so it should avoid
/// anything that is not async-signal-safe in a multithreaded parent.
pub fn fork_call<F>(f: F) -> Result<Pid, Error>
where
    F: FnOnce() -> i32,
{
    // SAFETY: the child only runs `f`, under the constraints documented above.
    match unsafe { fork() }? {
        ForkResult::Child => {
            become_tracee();

            let code = f();

            unsafe { libc::_exit(code) }
        },
        ForkResult::Parent { child } => {
            Ok(child)
        },
    }
}

// In a forked child: request tracing, then stop so the parent observes us before we run.
//
// On failure, `_exit()` rather than unwind, since we are in a forked copy of the parent.
fn become_tracee() {
    if trace_me().is_err() {
        unsafe { libc::_exit(EXIT_SETUP_FAILED) }
    }

    if raise(Signal::SIGSTOP).is_err() {
        unsafe { libc::_exit(EXIT_SETUP_FAILED) }
    }
}
