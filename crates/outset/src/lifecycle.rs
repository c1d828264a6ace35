//! The lifecycle coordinator.
//!
//! [`Lifecycle`] sequences the four phases of a pluggable CLI invocation:
//!
//! ```text
//! execute()
//!   ├─ init()      local Init callbacks, then the Init event
//!   ├─ register()  local Register callbacks, then the Register event
//!   │              (plugins attach subcommands to the command tree here)
//!   ├─ engine run  parse the argument list, run the matched handler
//!   └─ done()      best-effort teardown, on every exit path
//! ```
//!
//! # Guarantees
//!
//! - Each phase's callbacks and its plugin event fire at most once per
//!   coordinator, however often the phase method is called.
//! - Within a phase, callbacks run strictly in registration order before the
//!   phase's plugin event fires; across phases, Init fully completes (or
//!   fails) before Register begins.
//! - Init and Register are fail-fast: the first callback or listener error
//!   aborts the phase and is returned. A failed phase stays marked as run and
//!   is never retried.
//! - `done()` runs on every exit path out of `execute()` (normal return,
//!   error return, or a panic unwinding out of the engine) and isolates each
//!   Done callback: an error or panic is reported to the failure observer and
//!   the remaining callbacks still run.
//!
//! The coordinator is single-threaded: all phases run synchronously on the
//! calling thread, and callback lists are plain `Vec`s behind `&mut self`.

use std::fmt;
use std::io::Write;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use outset_plug::{DispatchError, Registry};
use thiserror::Error;

use crate::builder::LifecycleBuilder;
use crate::engine::{CommandSet, Engine, EngineError};
use crate::events::{InitEvent, RegisterEvent};
use crate::observer::FailureObserver;

/// Type alias for an Init- or Register-phase callback.
pub type PhaseCallback = Box<dyn FnMut(&mut Lifecycle) -> Result<(), anyhow::Error>>;

/// Type alias for a Done-phase callback.
pub type DoneCallback = Box<dyn FnMut() -> Result<(), anyhow::Error>>;

/// The lifecycle phase an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The Init phase.
    Init,
    /// The Register phase.
    Register,
    /// The Done (teardown) phase.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Register => write!(f, "register"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// Error returned by [`Lifecycle::init`] and [`Lifecycle::register`].
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A local callback failed; later callbacks and the plugin event did not run.
    #[error("{phase} callback #{index} failed: {source}")]
    Callback {
        /// The phase whose callback failed.
        phase: Phase,
        /// Zero-based position of the failing callback in registration order.
        index: usize,
        /// The callback's error.
        #[source]
        source: anyhow::Error,
    },
    /// The phase's plugin event dispatch failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Error returned by [`Lifecycle::execute`].
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Init or Register failed before the engine ran.
    #[error(transparent)]
    Phase(#[from] PhaseError),
    /// The engine reported a terminal error and no error stream is configured.
    #[error("command failed: {0}")]
    Engine(#[source] EngineError),
}

/// Coordinates the Init → Register → run → Done sequence of a CLI invocation.
///
/// Built once per process invocation via [`Lifecycle::builder`], with the
/// argument list, command tree, engine, plugin registry, error stream and
/// failure observer all injected at construction. See the
/// [module docs](self) for the phase guarantees.
pub struct Lifecycle {
    pub(crate) commands: CommandSet,
    pub(crate) engine: Box<dyn Engine>,
    pub(crate) plugins: Rc<Registry>,
    pub(crate) args: Vec<String>,
    pub(crate) error_stream: Option<Box<dyn Write>>,
    pub(crate) observer: Box<dyn FailureObserver>,
    pub(crate) init_called: bool,
    pub(crate) register_called: bool,
    pub(crate) done_called: bool,
    pub(crate) init_callbacks: Vec<PhaseCallback>,
    pub(crate) register_callbacks: Vec<PhaseCallback>,
    pub(crate) done_callbacks: Vec<DoneCallback>,
}

impl Lifecycle {
    /// Creates a builder with default args, engine, registry and error stream.
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::new()
    }

    /// Appends an Init-phase callback.
    ///
    /// Callbacks registered after `init()` has fired are kept but never run.
    pub fn on_init<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Lifecycle) -> Result<(), anyhow::Error> + 'static,
    {
        self.init_callbacks.push(Box::new(callback));
    }

    /// Appends a Register-phase callback.
    pub fn on_register<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Lifecycle) -> Result<(), anyhow::Error> + 'static,
    {
        self.register_callbacks.push(Box::new(callback));
    }

    /// Appends a Done-phase callback.
    ///
    /// The callback's result is only observed by the failure observer; it is
    /// never returned to the caller of [`done`](Self::done).
    pub fn on_done<F>(&mut self, callback: F)
    where
        F: FnMut() -> Result<(), anyhow::Error> + 'static,
    {
        self.done_callbacks.push(Box::new(callback));
    }

    /// The argument list captured at construction.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The plugin registry events are dispatched on.
    pub fn plugins(&self) -> &Rc<Registry> {
        &self.plugins
    }

    /// The command tree.
    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// The command tree, mutably. Register callbacks use this to mount
    /// subcommands and bind handlers.
    pub fn commands_mut(&mut self) -> &mut CommandSet {
        &mut self.commands
    }

    /// Runs the Init phase: local callbacks in registration order, then the
    /// [`InitEvent`] on the plugin registry. Fail-fast on the first error.
    ///
    /// Idempotent: second and later calls (including re-entrant calls from an
    /// Init callback) return `Ok(())` without side effects. A failed Init is
    /// never retried.
    pub fn init(&mut self) -> Result<(), PhaseError> {
        if self.init_called {
            return Ok(());
        }
        // The guard flips before any side effect so a re-entrant call from a
        // callback is a no-op instead of infinite recursion.
        self.init_called = true;

        let mut callbacks = mem::take(&mut self.init_callbacks);
        self.run_callbacks(Phase::Init, &mut callbacks)?;

        let mut event = InitEvent;
        self.plugins.trigger(&mut event)?;
        Ok(())
    }

    /// Runs the Register phase: local callbacks in registration order, then
    /// the [`RegisterEvent`] carrying the command tree. Fail-fast.
    ///
    /// Idempotent with the same guard pattern as [`init`](Self::init). Does
    /// not require Init to have run; `execute()` is what orders the two.
    pub fn register(&mut self) -> Result<(), PhaseError> {
        if self.register_called {
            return Ok(());
        }
        self.register_called = true;

        let mut callbacks = mem::take(&mut self.register_callbacks);
        self.run_callbacks(Phase::Register, &mut callbacks)?;

        // The tree moves into the event for the dispatch and is reclaimed
        // afterwards, error or not.
        let commands = mem::replace(&mut self.commands, CommandSet::detached());
        let mut event = RegisterEvent::new(commands);
        let dispatched = self.plugins.trigger(&mut event);
        self.commands = event.into_commands();
        dispatched?;
        Ok(())
    }

    /// Runs a full invocation: Init, Register, engine run, Done.
    ///
    /// Single-shot: calling it again after a completed run is out of contract
    /// (the phases are spent). The Done phase is armed before anything else,
    /// so it runs whether this returns normally, returns an error, or a panic
    /// unwinds out of the engine.
    ///
    /// A terminal engine error is written to the error stream (with a
    /// trailing newline) and swallowed when a stream is configured: usage
    /// errors are user-facing text, not process-fatal signals. With no stream
    /// configured the error is returned as [`ExecuteError::Engine`].
    pub fn execute(&mut self) -> Result<(), ExecuteError> {
        let mut guard = DoneOnExit { lifecycle: self };

        guard.init()?;
        guard.register()?;

        let lifecycle: &mut Lifecycle = &mut guard;
        let run = lifecycle.engine.run(&mut lifecycle.commands, &lifecycle.args);
        match run {
            Ok(()) => Ok(()),
            Err(error) => match lifecycle.error_stream.as_mut() {
                Some(stream) => {
                    let _ = writeln!(stream, "{error}");
                    Ok(())
                }
                None => Err(ExecuteError::Engine(error)),
            },
        }
    }

    /// Runs the Done phase: every callback in registration order, each one
    /// individually isolated.
    ///
    /// A callback that errors or panics is reported to the failure observer
    /// and the remaining callbacks still run. Never fails, never panics.
    /// Idempotent: later calls are no-ops.
    pub fn done(&mut self) {
        if self.done_called {
            return;
        }
        self.done_called = true;

        let callbacks = mem::take(&mut self.done_callbacks);
        for (index, mut callback) in callbacks.into_iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => self.observer.callback_failed(index, &error),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.observer.callback_panicked(index, &message);
                }
            }
        }
    }

    fn run_callbacks(
        &mut self,
        phase: Phase,
        callbacks: &mut [PhaseCallback],
    ) -> Result<(), PhaseError> {
        for (index, callback) in callbacks.iter_mut().enumerate() {
            callback(self).map_err(|source| PhaseError::Callback {
                phase,
                index,
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("commands", &self.commands)
            .field("init_called", &self.init_called)
            .field("register_called", &self.register_called)
            .field("done_called", &self.done_called)
            .finish_non_exhaustive()
    }
}

/// Drop guard arming the Done phase for every exit path out of `execute()`.
struct DoneOnExit<'a> {
    lifecycle: &'a mut Lifecycle,
}

impl Deref for DoneOnExit<'_> {
    type Target = Lifecycle;

    fn deref(&self) -> &Lifecycle {
        self.lifecycle
    }
}

impl DerefMut for DoneOnExit<'_> {
    fn deref_mut(&mut self) -> &mut Lifecycle {
        self.lifecycle
    }
}

impl Drop for DoneOnExit<'_> {
    fn drop(&mut self) {
        // done() catches its own callbacks' panics, so dropping during an
        // unwind cannot turn into a double panic.
        self.lifecycle.done();
    }
}

/// Renders a panic payload for failure reports.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn quiet() -> Lifecycle {
        Lifecycle::builder()
            .args(["app"])
            .propagate_engine_errors()
            .build()
    }

    #[test]
    fn test_init_fires_callbacks_exactly_once() {
        let count = Rc::new(Cell::new(0u32));
        let count_probe = count.clone();

        let mut lifecycle = quiet();
        lifecycle.on_init(move |_lifecycle| {
            count_probe.set(count_probe.get() + 1);
            Ok(())
        });

        lifecycle.init().unwrap();
        lifecycle.init().unwrap();
        lifecycle.init().unwrap();

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_init_event_fires_exactly_once() {
        let count = Rc::new(Cell::new(0u32));
        let count_probe = count.clone();

        let registry = Rc::new(Registry::new());
        registry.on(move |_event: &mut InitEvent| {
            count_probe.set(count_probe.get() + 1);
            Ok(())
        });

        let mut lifecycle = Lifecycle::builder()
            .args(["app"])
            .plugins(registry)
            .propagate_engine_errors()
            .build();

        lifecycle.init().unwrap();
        lifecycle.init().unwrap();

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_init_callbacks_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut lifecycle = quiet();
        for label in ["a", "b", "c"] {
            let order = order.clone();
            lifecycle.on_init(move |_lifecycle| {
                order.borrow_mut().push(label);
                Ok(())
            });
        }

        lifecycle.init().unwrap();
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_init_is_fail_fast_and_never_retried() {
        let later_ran = Rc::new(Cell::new(false));
        let later_probe = later_ran.clone();

        let mut lifecycle = quiet();
        lifecycle.on_init(|_lifecycle| Err(anyhow::anyhow!("config missing")));
        lifecycle.on_init(move |_lifecycle| {
            later_probe.set(true);
            Ok(())
        });

        let err = lifecycle.init().unwrap_err();
        assert!(matches!(
            err,
            PhaseError::Callback {
                phase: Phase::Init,
                index: 0,
                ..
            }
        ));
        assert!(!later_ran.get());

        // The phase is spent: a second call is a successful no-op, not a retry.
        assert!(lifecycle.init().is_ok());
        assert!(!later_ran.get());
    }

    #[test]
    fn test_reentrant_init_from_callback_is_noop() {
        let count = Rc::new(Cell::new(0u32));
        let count_probe = count.clone();

        let mut lifecycle = quiet();
        lifecycle.on_init(move |lifecycle| {
            count_probe.set(count_probe.get() + 1);
            lifecycle.init()?;
            Ok(())
        });

        lifecycle.init().unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_callback_registered_during_fanout_never_fires() {
        let late_ran = Rc::new(Cell::new(false));
        let late_probe = late_ran.clone();

        let mut lifecycle = quiet();
        lifecycle.on_init(move |lifecycle| {
            let late_probe = late_probe.clone();
            lifecycle.on_init(move |_lifecycle| {
                late_probe.set(true);
                Ok(())
            });
            Ok(())
        });

        lifecycle.init().unwrap();
        lifecycle.init().unwrap();
        assert!(!late_ran.get());
    }

    #[test]
    fn test_register_before_init_succeeds() {
        let ran = Rc::new(Cell::new(false));
        let ran_probe = ran.clone();

        let mut lifecycle = quiet();
        lifecycle.on_register(move |_lifecycle| {
            ran_probe.set(true);
            Ok(())
        });

        lifecycle.register().unwrap();
        assert!(ran.get());
        assert!(!lifecycle.init_called);
    }

    #[test]
    fn test_register_event_failure_keeps_command_tree() {
        let registry = Rc::new(Registry::new());
        registry.on(|_event: &mut RegisterEvent| Err(anyhow::anyhow!("listener refused")));

        let mut lifecycle = Lifecycle::builder()
            .args(["app"])
            .plugins(registry)
            .propagate_engine_errors()
            .build();

        assert!(lifecycle.register().is_err());
        // The tree was reclaimed from the event despite the dispatch failure.
        assert_eq!(lifecycle.commands().root().get_name(), "app");
    }

    #[test]
    fn test_done_is_idempotent() {
        let count = Rc::new(Cell::new(0u32));
        let count_probe = count.clone();

        let mut lifecycle = quiet();
        lifecycle.on_done(move || {
            count_probe.set(count_probe.get() + 1);
            Ok(())
        });

        lifecycle.done();
        lifecycle.done();

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Init.to_string(), "init");
        assert_eq!(Phase::Register.to_string(), "register");
        assert_eq!(Phase::Done.to_string(), "done");
    }
}
