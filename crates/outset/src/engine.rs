//! The command tree and the engine that runs it.
//!
//! [`CommandSet`] is the mutable tree of named commands with bound handlers
//! that Register-phase listeners get to extend before parsing begins. The
//! [`Engine`] trait is the seam between the lifecycle coordinator and the
//! parsing library; [`ClapEngine`] is the default implementation, driving the
//! tree with clap.
//!
//! Handlers are keyed by dot-separated command path (`"archive"`,
//! `"config.get"`), following the subcommand chain from the root.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use clap::{ArgMatches, Command};
use thiserror::Error;

/// Type alias for a handler bound to a command path.
pub type CommandHandler = Box<dyn FnMut(&ArgMatches) -> Result<(), anyhow::Error>>;

/// Error reported by an [`Engine`] run.
///
/// Engine errors are opaque text meant for human display: usage errors,
/// unknown commands, handler failures. The lifecycle coordinator decides
/// whether they go to the error stream or to the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Creates an engine error from displayable text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable error text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<clap::Error> for EngineError {
    fn from(err: clap::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The mutable command tree with bound handlers.
///
/// Wraps the clap root [`Command`] plus the handler for each command path.
/// Register-phase listeners receive the set inside a
/// [`RegisterEvent`](crate::RegisterEvent) and extend it with
/// [`mount`](Self::mount) or [`handle`](Self::handle) before the engine parses
/// the argument list.
pub struct CommandSet {
    root: Command,
    handlers: HashMap<String, CommandHandler>,
}

impl CommandSet {
    /// Creates a command set around the given root command.
    pub fn new(root: Command) -> Self {
        Self {
            root,
            handlers: HashMap::new(),
        }
    }

    /// Placeholder used while the real set is moved into a register event.
    pub(crate) fn detached() -> Self {
        Self::new(Command::new("__detached"))
    }

    /// Returns the root command.
    pub fn root(&self) -> &Command {
        &self.root
    }

    /// Returns the root command mutably.
    pub fn root_mut(&mut self) -> &mut Command {
        &mut self.root
    }

    /// Attaches `command` as a top-level subcommand and binds its handler.
    pub fn mount<F>(&mut self, command: Command, handler: F)
    where
        F: FnMut(&ArgMatches) -> Result<(), anyhow::Error> + 'static,
    {
        self.mount_boxed(command, Box::new(handler));
    }

    pub(crate) fn mount_boxed(&mut self, command: Command, handler: CommandHandler) {
        let path = command.get_name().to_string();
        let root = mem::replace(&mut self.root, Command::new("__detached"));
        self.root = root.subcommand(command);
        self.handlers.insert(path, handler);
    }

    /// Binds a handler to an already-declared command path.
    ///
    /// Use this for nested commands declared directly on the root tree
    /// (`"config.get"`), or bind the empty path `""` to handle a bare
    /// invocation with no subcommand.
    pub fn handle<F>(&mut self, path: impl Into<String>, handler: F)
    where
        F: FnMut(&ArgMatches) -> Result<(), anyhow::Error> + 'static,
    {
        self.handlers.insert(path.into(), Box::new(handler));
    }

    /// Returns `true` if a handler is bound to `path`.
    pub fn has_handler(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    /// Runs the handler bound to `path`, if any.
    pub fn dispatch(
        &mut self,
        path: &str,
        matches: &ArgMatches,
    ) -> Option<Result<(), anyhow::Error>> {
        self.handlers.get_mut(path).map(|handler| handler(matches))
    }
}

impl fmt::Debug for CommandSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        paths.sort_unstable();
        f.debug_struct("CommandSet")
            .field("root", &self.root.get_name())
            .field("handlers", &paths)
            .finish()
    }
}

/// The parsing/execution engine contract.
///
/// Receives the finalized argument list and the command tree; parses, routes,
/// and runs the matched handler. Implementations other than [`ClapEngine`]
/// exist mostly for embedding and tests.
pub trait Engine {
    /// Parses `args` against the tree and runs the matched handler.
    fn run(&mut self, commands: &mut CommandSet, args: &[String]) -> Result<(), EngineError>;
}

/// Default engine backed by clap.
///
/// Parsing failures (bad flags, unrecognized subcommands, `--help`) surface as
/// [`EngineError`]s carrying clap's rendered message. A declared subcommand
/// with no bound handler reports `unknown command: <path>`; a bare invocation
/// with no root handler reports the rendered help.
#[derive(Debug, Default)]
pub struct ClapEngine;

impl ClapEngine {
    /// Creates a new clap engine.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for ClapEngine {
    fn run(&mut self, commands: &mut CommandSet, args: &[String]) -> Result<(), EngineError> {
        let matches = commands.root_mut().try_get_matches_from_mut(args)?;

        let path = command_path(&matches);
        let deepest = deepest_matches(&matches);

        match commands.dispatch(&path, deepest) {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => Err(EngineError::new(format!("{err:#}"))),
            None if path.is_empty() => {
                Err(EngineError::new(commands.root_mut().render_help().to_string()))
            }
            None => Err(EngineError::new(format!("unknown command: {path}"))),
        }
    }
}

/// Builds the dot-separated command path by following the subcommand chain.
fn command_path(matches: &ArgMatches) -> String {
    let mut path = Vec::new();
    let mut current = matches;

    while let Some((name, sub)) = current.subcommand() {
        path.push(name);
        current = sub;
    }

    path.join(".")
}

/// Returns the matches of the most deeply nested subcommand.
fn deepest_matches(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;

    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }

    current
}
