//! End-to-end tests for the lifecycle coordinator: phase ordering, failure
//! isolation, and the error-stream contract, driven through `execute()` the
//! way a real binary drives it.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use clap::Command;
use outset::{
    CommandSet, Engine, EngineError, ExecuteError, FailureObserver, InitEvent, Lifecycle,
    RegisterEvent, Registry,
};

/// Write sink that keeps its contents reachable after being moved into the
/// lifecycle.
#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl SharedSink {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Observer that records failure reports for assertions.
#[derive(Clone, Default)]
struct RecordingObserver {
    reports: Rc<RefCell<Vec<String>>>,
}

impl RecordingObserver {
    fn reports(&self) -> Vec<String> {
        self.reports.borrow().clone()
    }
}

impl FailureObserver for RecordingObserver {
    fn callback_failed(&mut self, index: usize, error: &anyhow::Error) {
        self.reports
            .borrow_mut()
            .push(format!("#{index} failed: {error}"));
    }

    fn callback_panicked(&mut self, index: usize, message: &str) {
        self.reports
            .borrow_mut()
            .push(format!("#{index} panicked: {message}"));
    }
}

/// Engine stub that records its invocation and returns a fixed result.
struct ScriptedEngine {
    error: Option<&'static str>,
    trace: Rc<RefCell<Vec<&'static str>>>,
}

impl Engine for ScriptedEngine {
    fn run(&mut self, _commands: &mut CommandSet, _args: &[String]) -> Result<(), EngineError> {
        self.trace.borrow_mut().push("engine");
        match self.error {
            Some(message) => Err(EngineError::new(message)),
            None => Ok(()),
        }
    }
}

/// Engine stub that unwinds, standing in for a parser bug.
struct PanickingEngine;

impl Engine for PanickingEngine {
    fn run(&mut self, _commands: &mut CommandSet, _args: &[String]) -> Result<(), EngineError> {
        panic!("engine exploded");
    }
}

fn trace() -> Rc<RefCell<Vec<&'static str>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn execute_runs_phases_in_order() {
    let steps = trace();
    let registry = Rc::new(Registry::new());

    {
        let steps = steps.clone();
        registry.on(move |_event: &mut InitEvent| {
            steps.borrow_mut().push("init-event");
            Ok(())
        });
    }
    {
        let steps = steps.clone();
        registry.on(move |_event: &mut RegisterEvent| {
            steps.borrow_mut().push("register-event");
            Ok(())
        });
    }

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .plugins(registry)
        .engine(ScriptedEngine {
            error: None,
            trace: steps.clone(),
        })
        .propagate_engine_errors()
        .build();

    {
        let steps = steps.clone();
        lifecycle.on_init(move |_lifecycle| {
            steps.borrow_mut().push("init-cb");
            Ok(())
        });
    }
    {
        let steps = steps.clone();
        lifecycle.on_register(move |_lifecycle| {
            steps.borrow_mut().push("register-cb");
            Ok(())
        });
    }
    {
        let steps = steps.clone();
        lifecycle.on_done(move || {
            steps.borrow_mut().push("done-cb");
            Ok(())
        });
    }

    lifecycle.execute().unwrap();

    assert_eq!(
        *steps.borrow(),
        vec![
            "init-cb",
            "init-event",
            "register-cb",
            "register-event",
            "engine",
            "done-cb"
        ]
    );
}

#[test]
fn execute_runs_init_before_register_even_when_registered_backwards() {
    let steps = trace();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .engine(ScriptedEngine {
            error: None,
            trace: steps.clone(),
        })
        .propagate_engine_errors()
        .build();

    // Register-phase callback registered first; Init still fires first.
    {
        let steps = steps.clone();
        lifecycle.on_register(move |_lifecycle| {
            steps.borrow_mut().push("register-cb");
            Ok(())
        });
    }
    {
        let steps = steps.clone();
        lifecycle.on_init(move |_lifecycle| {
            steps.borrow_mut().push("init-cb");
            Ok(())
        });
    }

    lifecycle.execute().unwrap();
    assert_eq!(*steps.borrow(), vec!["init-cb", "register-cb", "engine"]);
}

#[test]
fn done_runs_when_init_fails() {
    let done_ran = Rc::new(Cell::new(false));
    let done_probe = done_ran.clone();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .propagate_engine_errors()
        .build();
    lifecycle.on_init(|_lifecycle| Err(anyhow::anyhow!("init refused")));
    lifecycle.on_done(move || {
        done_probe.set(true);
        Ok(())
    });

    let err = lifecycle.execute().unwrap_err();
    assert!(matches!(err, ExecuteError::Phase(_)));
    assert!(err.to_string().contains("init refused"));
    assert!(done_ran.get());
}

#[test]
fn done_runs_when_register_fails() {
    let done_ran = Rc::new(Cell::new(false));
    let done_probe = done_ran.clone();

    let registry = Rc::new(Registry::new());
    registry.on(|_event: &mut RegisterEvent| Err(anyhow::anyhow!("listener refused")));

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .plugins(registry)
        .propagate_engine_errors()
        .build();
    lifecycle.on_done(move || {
        done_probe.set(true);
        Ok(())
    });

    assert!(lifecycle.execute().is_err());
    assert!(done_ran.get());
}

#[test]
fn done_runs_when_engine_panics() {
    let done_ran = Rc::new(Cell::new(false));
    let done_probe = done_ran.clone();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .engine(PanickingEngine)
        .propagate_engine_errors()
        .build();
    lifecycle.on_done(move || {
        done_probe.set(true);
        Ok(())
    });

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| lifecycle.execute()));
    assert!(result.is_err());
    assert!(done_ran.get());
}

#[test]
fn panicking_done_callback_does_not_silence_siblings() {
    let ran = Rc::new(RefCell::new(Vec::new()));
    let observer = RecordingObserver::default();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .observer(observer.clone())
        .propagate_engine_errors()
        .build();

    {
        let ran = ran.clone();
        lifecycle.on_done(move || {
            ran.borrow_mut().push(1);
            Ok(())
        });
    }
    lifecycle.on_done(|| panic!("teardown bug"));
    {
        let ran = ran.clone();
        lifecycle.on_done(move || {
            ran.borrow_mut().push(3);
            Ok(())
        });
    }

    lifecycle.done();

    assert_eq!(*ran.borrow(), vec![1, 3]);
    assert_eq!(observer.reports(), vec!["#1 panicked: teardown bug"]);
}

#[test]
fn failing_done_callback_is_reported_and_isolated() {
    let ran = Rc::new(Cell::new(false));
    let ran_probe = ran.clone();
    let observer = RecordingObserver::default();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .observer(observer.clone())
        .propagate_engine_errors()
        .build();

    lifecycle.on_done(|| Err(anyhow::anyhow!("flush failed")));
    lifecycle.on_done(move || {
        ran_probe.set(true);
        Ok(())
    });

    lifecycle.done();

    assert!(ran.get());
    assert_eq!(observer.reports(), vec!["#0 failed: flush failed"]);
}

#[test]
fn engine_error_is_written_to_stream_and_swallowed() {
    let sink = SharedSink::default();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .engine(ScriptedEngine {
            error: Some("unknown command: foo"),
            trace: trace(),
        })
        .error_stream(sink.clone())
        .build();

    lifecycle.execute().unwrap();
    assert_eq!(sink.contents(), "unknown command: foo\n");
}

#[test]
fn engine_error_propagates_without_stream() {
    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .engine(ScriptedEngine {
            error: Some("bad flag"),
            trace: trace(),
        })
        .propagate_engine_errors()
        .build();

    let err = lifecycle.execute().unwrap_err();
    assert!(matches!(err, ExecuteError::Engine(_)));
    assert!(err.to_string().contains("bad flag"));
}

#[test]
fn plugin_contributed_subcommand_runs_end_to_end() {
    let archived = Rc::new(Cell::new(false));
    let registry = Rc::new(Registry::new());

    {
        let archived = archived.clone();
        registry.on(move |event: &mut RegisterEvent| {
            let archived = archived.clone();
            event
                .commands_mut()
                .mount(Command::new("archive"), move |_matches| {
                    archived.set(true);
                    Ok(())
                });
            Ok(())
        });
    }

    let mut lifecycle = Lifecycle::builder()
        .args(["notes", "archive"])
        .plugins(registry)
        .propagate_engine_errors()
        .build();

    lifecycle.execute().unwrap();
    assert!(archived.get());
}

#[test]
fn direct_phase_calls_are_not_repeated_by_execute() {
    let init_count = Rc::new(Cell::new(0u32));
    let init_probe = init_count.clone();

    let mut lifecycle = Lifecycle::builder()
        .args(["app"])
        .engine(ScriptedEngine {
            error: None,
            trace: trace(),
        })
        .propagate_engine_errors()
        .build();
    lifecycle.on_init(move |_lifecycle| {
        init_probe.set(init_probe.get() + 1);
        Ok(())
    });

    lifecycle.init().unwrap();
    lifecycle.execute().unwrap();

    assert_eq!(init_count.get(), 1);
}
