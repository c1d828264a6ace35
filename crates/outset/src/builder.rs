//! Builder for constructing [`Lifecycle`] instances.
//!
//! Defaults match what a binary wants: arguments from the process, errors to
//! process stderr, a clap engine, a fresh plugin registry. Tests and
//! embedders override the pieces they care about.
//!
//! ```rust,no_run
//! use clap::Command;
//! use outset::Lifecycle;
//!
//! let mut lifecycle = Lifecycle::builder()
//!     .root(Command::new("notes").about("A tiny note taker"))
//!     .mount(Command::new("list"), |_matches| {
//!         println!("nothing here yet");
//!         Ok(())
//!     })
//!     .build();
//!
//! if lifecycle.execute().is_err() {
//!     std::process::exit(1);
//! }
//! ```

use std::io::{self, Write};
use std::rc::Rc;

use clap::{ArgMatches, Command};
use outset_plug::Registry;

use crate::engine::{ClapEngine, CommandHandler, CommandSet, Engine};
use crate::lifecycle::{DoneCallback, Lifecycle, PhaseCallback};
use crate::observer::{FailureObserver, TracingObserver};

/// Where engine errors go.
enum ErrorStream {
    /// Process stderr (the default for binaries).
    Inherit,
    /// No stream: engine errors propagate out of `execute()`.
    Disabled,
    /// A caller-supplied sink (tests, embedders).
    Sink(Box<dyn Write>),
}

/// Builder for [`Lifecycle`]. Created with [`Lifecycle::builder`].
pub struct LifecycleBuilder {
    root: Option<Command>,
    engine: Box<dyn Engine>,
    plugins: Option<Rc<Registry>>,
    args: Option<Vec<String>>,
    error_stream: ErrorStream,
    observer: Box<dyn FailureObserver>,
    mounts: Vec<(Command, CommandHandler)>,
    init_callbacks: Vec<PhaseCallback>,
    register_callbacks: Vec<PhaseCallback>,
    done_callbacks: Vec<DoneCallback>,
}

impl LifecycleBuilder {
    pub(crate) fn new() -> Self {
        Self {
            root: None,
            engine: Box::new(ClapEngine::new()),
            plugins: None,
            args: None,
            error_stream: ErrorStream::Inherit,
            observer: Box::new(TracingObserver),
            mounts: Vec::new(),
            init_callbacks: Vec::new(),
            register_callbacks: Vec::new(),
            done_callbacks: Vec::new(),
        }
    }

    /// Sets the root command.
    ///
    /// Defaults to a bare command named after the first argument. A supplied
    /// root with an empty name is also renamed after the first argument.
    pub fn root(mut self, root: Command) -> Self {
        self.root = Some(root);
        self
    }

    /// Replaces the default [`ClapEngine`].
    pub fn engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Sets the plugin registry events are dispatched on.
    ///
    /// Defaults to a fresh empty registry. Pass the `Rc` you hand to your
    /// plugins so their listeners and the lifecycle share one registry.
    pub fn plugins(mut self, plugins: Rc<Registry>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Sets the argument list. Defaults to [`std::env::args`].
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Redirects engine errors to the given sink instead of process stderr.
    pub fn error_stream(mut self, sink: impl Write + 'static) -> Self {
        self.error_stream = ErrorStream::Sink(Box::new(sink));
        self
    }

    /// Removes the error stream: engine errors return from `execute()`
    /// instead of being printed and swallowed. For embedding and automation.
    pub fn propagate_engine_errors(mut self) -> Self {
        self.error_stream = ErrorStream::Disabled;
        self
    }

    /// Replaces the default [`TracingObserver`] for teardown failures.
    pub fn observer(mut self, observer: impl FailureObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Attaches a top-level subcommand with its handler to the command tree.
    pub fn mount<F>(mut self, command: Command, handler: F) -> Self
    where
        F: FnMut(&ArgMatches) -> Result<(), anyhow::Error> + 'static,
    {
        self.mounts.push((command, Box::new(handler)));
        self
    }

    /// Appends an Init-phase callback.
    pub fn on_init<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut Lifecycle) -> Result<(), anyhow::Error> + 'static,
    {
        self.init_callbacks.push(Box::new(callback));
        self
    }

    /// Appends a Register-phase callback.
    pub fn on_register<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut Lifecycle) -> Result<(), anyhow::Error> + 'static,
    {
        self.register_callbacks.push(Box::new(callback));
        self
    }

    /// Appends a Done-phase callback.
    pub fn on_done<F>(mut self, callback: F) -> Self
    where
        F: FnMut() -> Result<(), anyhow::Error> + 'static,
    {
        self.done_callbacks.push(Box::new(callback));
        self
    }

    /// Builds the lifecycle.
    pub fn build(self) -> Lifecycle {
        let args: Vec<String> = self
            .args
            .unwrap_or_else(|| std::env::args().collect());
        let program = args
            .first()
            .cloned()
            .unwrap_or_else(|| "cli".to_string());

        let root = match self.root {
            Some(root) if root.get_name().is_empty() => root.name(program),
            Some(root) => root,
            None => Command::new(program),
        };

        let mut commands = CommandSet::new(root);
        for (command, handler) in self.mounts {
            commands.mount_boxed(command, handler);
        }

        let error_stream: Option<Box<dyn Write>> = match self.error_stream {
            ErrorStream::Inherit => Some(Box::new(io::stderr())),
            ErrorStream::Disabled => None,
            ErrorStream::Sink(sink) => Some(sink),
        };

        Lifecycle {
            commands,
            engine: self.engine,
            plugins: self.plugins.unwrap_or_else(|| Rc::new(Registry::new())),
            args,
            error_stream,
            observer: self.observer,
            init_called: false,
            register_called: false,
            done_called: false,
            init_callbacks: self.init_callbacks,
            register_callbacks: self.register_callbacks,
            done_callbacks: self.done_callbacks,
        }
    }
}
