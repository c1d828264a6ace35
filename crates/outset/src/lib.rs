//! # Outset - Plugin-Driven CLI Bootstrap
//!
//! Outset coordinates the startup and teardown of a pluggable command-line
//! tool: the set of available subcommands and the initialization behavior are
//! contributed by plugins rather than hard-coded in `main()`.
//!
//! The heart of the crate is the [`Lifecycle`] coordinator, which sequences
//! four phases and guarantees each runs at most once:
//!
//! - **Init**: local Init callbacks run in registration order, then an
//!   [`InitEvent`] goes out to every plugin listener. Fail-fast: partial
//!   initialization is unsafe to continue from.
//! - **Register**: local Register callbacks, then a [`RegisterEvent`]
//!   carrying the command tree so plugins can attach subcommands and bind
//!   handlers before parsing begins.
//! - **Execute**: the engine parses the finalized argument list and runs the
//!   matched handler. Usage errors are printed to the error stream and
//!   swallowed (users expect text, not stack traces); embedders can opt into
//!   propagation instead.
//! - **Done**: best-effort teardown on every exit path, even when an earlier
//!   phase failed or the engine panicked. Each Done callback is individually
//!   isolated: one failing or panicking callback never silences its siblings.
//!
//! # Quick Start
//!
//! ```rust
//! use clap::Command;
//! use outset::Lifecycle;
//!
//! let mut lifecycle = Lifecycle::builder()
//!     .args(["notes", "list"])
//!     .mount(Command::new("list"), |_matches| {
//!         // business logic here
//!         Ok(())
//!     })
//!     .build();
//!
//! lifecycle.execute().unwrap();
//! ```
//!
//! # Plugins
//!
//! Plugins come from the companion `outset-plug` crate: they implement
//! [`Plugin`](outset_plug::Plugin), get installed on a shared
//! [`Registry`](outset_plug::Registry), and listen on the typed lifecycle
//! channels:
//!
//! ```rust
//! use clap::Command;
//! use outset::{Lifecycle, RegisterEvent};
//! use outset_plug::Registry;
//! use std::rc::Rc;
//!
//! let registry = Rc::new(Registry::new());
//! registry.on(|event: &mut RegisterEvent| {
//!     event.commands_mut().mount(Command::new("archive"), |_matches| Ok(()));
//!     Ok(())
//! });
//!
//! let mut lifecycle = Lifecycle::builder()
//!     .args(["notes", "archive"])
//!     .plugins(registry)
//!     .build();
//!
//! lifecycle.execute().unwrap();
//! ```
//!
//! # Single-Threaded Design
//!
//! CLI invocations are single-threaded: build the lifecycle, run it once,
//! exit. Callbacks use `FnMut`, the registry is shared via `Rc`, and nothing
//! in the crate takes a lock. If you need to drive two invocations
//! concurrently, put each lifecycle on its own thread with its own registry.

mod builder;
mod engine;
mod events;
mod lifecycle;
mod observer;

pub use builder::LifecycleBuilder;
pub use engine::{ClapEngine, CommandHandler, CommandSet, Engine, EngineError};
pub use events::{InitEvent, RegisterEvent, INIT_CHANNEL, REGISTER_CHANNEL};
pub use lifecycle::{
    DoneCallback, ExecuteError, Lifecycle, Phase, PhaseCallback, PhaseError,
};
pub use observer::{FailureObserver, TracingObserver};

// Re-export the plugin-facing types so applications and plugins can depend on
// `outset` alone.
pub use outset_plug::{DispatchError, Options, Plugin, PluginEvent, Registry};
