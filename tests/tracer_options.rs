use anyhow::Result;
use ntest::timeout;
use pinktrace::{Options, Pid, PtraceEvent, Restart, Signal, StopEvent, Tracer};
use pinktrace::tracer::{DEFAULT_OPTIONS, REQUIRED_OPTIONS};
use pretty_assertions::assert_eq;

mod support;
use support::*;

type O = Options;

const CASES: &[O] = &[
    // Missing required options
    O::empty(),
    REQUIRED_OPTIONS.difference(O::PTRACE_O_TRACEEXEC),
    REQUIRED_OPTIONS.difference(O::PTRACE_O_TRACESYSGOOD),
    O::all().difference(O::PTRACE_O_TRACEEXEC),
    O::all().difference(O::PTRACE_O_TRACESYSGOOD),

    // Complete
    REQUIRED_OPTIONS,
    REQUIRED_OPTIONS.union(O::PTRACE_O_TRACEFORK),
    O::all(),
];

#[test]
fn test_tracer_options_default() -> Result<()> {
    let tracer = Tracer::new(Pid::from_raw(1));

    assert_eq!(tracer.options(), DEFAULT_OPTIONS);
    assert!(tracer.options().contains(REQUIRED_OPTIONS));

    Ok(())
}

#[test]
fn test_tracer_options() -> Result<()> {
    for &opts in CASES {
        // Never waited on, so the options are only recorded.
        let mut tracer = Tracer::new(Pid::from_raw(1));
        tracer.set_options(opts)?;

        assert!(tracer.options().contains(REQUIRED_OPTIONS));
        assert!(tracer.options().contains(opts));
    }

    Ok(())
}

#[test]
#[timeout(5000)]
fn test_trace_fork() -> Result<()> {
    let mut tracer = Tracer::fork(|| unsafe {
        match libc::fork() {
            -1 => 1,
            0 => libc::_exit(5),
            _ => 0,
        }
    })?;
    tracer.set_options(REQUIRED_OPTIONS | O::PTRACE_O_TRACEFORK)?;

    start(&mut tracer)?;

    let new = loop {
        tracer.restart(Restart::Continue, None)?;

        match tracer.wait()? {
            StopEvent::Event(PtraceEvent::Fork { new }) => break new,
            stop if stop.is_terminal() => panic!("tracee ended before forking: {:?}", stop),
            _ => {},
        }
    };

    // Auto-attached children start with a `SIGSTOP`.
    let mut child = Tracer::new(new);
    assert_eq!(child.wait()?, StopEvent::Signaled(Signal::SIGSTOP));

    assert_eq!(finish(&mut child)?, 5);
    assert_eq!(finish(&mut tracer)?, 0);

    Ok(())
}
