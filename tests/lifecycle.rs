use anyhow::Result;
use ntest::timeout;
use pinktrace::{
    Error,
    Options,
    PtraceEvent,
    Signal,
    State,
    StopEvent,
    Tracer,
    tracer::trace_me,
};
use pretty_assertions::assert_eq;

mod support;
use support::*;

// Support absence of `assert_matches!` on stable.
macro_rules! assert_matches {
    ($expr: expr, $pat: pat) => {
        if let $pat = $expr {
            // Pass.
        } else {
            panic!("expected `{}` to match `{}`", stringify!($expr), stringify!($pat));
        }
    }
}

#[test]
#[timeout(2000)]
fn test_kill_after_exit() -> Result<()> {
    let mut tracer = Tracer::fork(|| 7)?;
    start(&mut tracer)?;

    assert_eq!(finish(&mut tracer)?, 7);
    assert_eq!(tracer.state(), State::Exited);

    // Exit and kill race, so this is not an error.
    tracer.kill()?;
    tracer.kill()?;

    assert_matches!(tracer.wait(), Err(Error::NoSuchProcess { .. }));
    assert_matches!(tracer.syscall(None), Err(Error::NoSuchProcess { .. }));
    assert_matches!(tracer.read_word(0), Err(Error::NoSuchProcess { .. }));

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_not_stopped() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;

    // Not yet seen to stop.
    assert_eq!(tracer.state(), State::Running);

    assert_matches!(tracer.read_word(0), Err(Error::NotStopped { .. }));
    assert_matches!(tracer.read_bytes(0, 16), Err(Error::NotStopped { .. }));
    assert_matches!(tracer.argument(0), Err(Error::NotStopped { .. }));
    assert_matches!(tracer.decode_address(1), Err(Error::NotStopped { .. }));
    assert_matches!(tracer.syscall(None), Err(Error::NotStopped { .. }));

    start(&mut tracer)?;
    assert_eq!(tracer.state(), State::Stopped(Signal::SIGSTOP));

    tracer.syscall(None)?;
    assert_eq!(tracer.state(), State::Running);
    assert_matches!(tracer.syscall(None), Err(Error::NotStopped { .. }));

    kill(&mut tracer)?;

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_tracee_died() -> Result<()> {
    let mut tracer = Tracer::fork(|| 0)?;
    start(&mut tracer)?;

    // Kill the stopped tracee, so subsequent ptrace requests fail.
    tracer.kill()?;

    let err = tracer.registers().unwrap_err();
    assert!(err.tracee_died(), "{:?}", err);

    let err = tracer.syscall(None).unwrap_err();
    assert!(err.tracee_died(), "{:?}", err);

    assert_eq!(tracer.wait()?, StopEvent::Killed {
        signal: Signal::SIGKILL,
        core_dumped: false,
    });

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_trace_me_twice() -> Result<()> {
    let mut tracer = Tracer::fork(|| match trace_me() {
        Err(Error::AlreadyTraced) => 0,
        _ => 1,
    })?;
    start(&mut tracer)?;

    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_exit_event() -> Result<()> {
    let mut tracer = Tracer::fork(|| 3)?;
    tracer.set_options(Options::PTRACE_O_TRACEEXIT)?;

    start(&mut tracer)?;

    assert!(tracer.options().contains(Options::PTRACE_O_TRACEEXIT));
    assert!(tracer.options().contains(Options::PTRACE_O_TRACESYSGOOD));

    let mut events = vec![];

    loop {
        tracer.restart(pinktrace::Restart::Continue, None)?;

        let stop = tracer.wait()?;
        events.push(stop);

        if stop.is_terminal() {
            break;
        }
    }

    assert_eq!(events, vec![
        StopEvent::Event(PtraceEvent::Exiting { exit_code: 3 }),
        StopEvent::Exited(3),
    ]);

    Ok(())
}

#[test]
#[timeout(2000)]
fn test_detach_not_stopped() -> Result<()> {
    let tracer = Tracer::fork(|| 0)?;
    let pid = tracer.pid();

    // Not yet seen to stop, so the tracer comes back.
    let err = tracer.detach(None).unwrap_err();
    assert_matches!(err.error, Error::NotStopped { .. });

    let mut tracer = err.tracer;
    assert_eq!(tracer.pid(), pid);

    start(&mut tracer)?;
    tracer.detach(None)?;

    Ok(())
}
