use anyhow::{bail, Result};
use pinktrace::{Restart, Signal, StopEvent, Tracer};
use pretty_assertions::assert_eq;

/// Wait for the initial `SIGSTOP` of a forked or spawned tracee.
#[allow(unused)]
pub fn start(tracer: &mut Tracer) -> Result<()> {
    let stop = tracer.wait()?;
    assert_eq!(stop, StopEvent::Signaled(Signal::SIGSTOP));

    Ok(())
}

/// Resume the tracee until it enters the syscall `name`.
#[allow(unused)]
pub fn run_to_entry(tracer: &mut Tracer, name: &str) -> Result<()> {
    loop {
        tracer.syscall(None)?;

        match tracer.wait()? {
            StopEvent::SyscallEntry => {
                let info = tracer.syscall_info()?;
                eprintln!("{}: entered {}", tracer.pid(), info.name);

                if info.name == name {
                    return Ok(());
                }
            },
            StopEvent::SyscallExit | StopEvent::Event(_) => {},
            stop => bail!("tracee stopped before entering {}: {:?}", name, stop),
        }
    }
}

/// Resume the tracee at a syscall-enter-stop until the matching exit.
#[allow(unused)]
pub fn run_to_exit(tracer: &mut Tracer) -> Result<()> {
    tracer.syscall(None)?;

    match tracer.wait()? {
        StopEvent::SyscallExit => Ok(()),
        stop => bail!("expected syscall-exit-stop, got {:?}", stop),
    }
}

/// Let the tracee run to completion, and return its exit code.
#[allow(unused)]
pub fn finish(tracer: &mut Tracer) -> Result<i32> {
    loop {
        tracer.restart(Restart::Continue, None)?;

        match tracer.wait()? {
            StopEvent::Exited(code) => return Ok(code),
            StopEvent::Killed { signal, .. } => bail!("tracee killed by {}", signal),
            _ => {},
        }
    }
}

/// Kill the tracee and reap it.
#[allow(unused)]
pub fn kill(tracer: &mut Tracer) -> Result<()> {
    tracer.kill()?;

    loop {
        if tracer.wait()?.is_terminal() {
            return Ok(());
        }
    }
}
