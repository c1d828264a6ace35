//! Typed lifecycle events delivered to the plugin registry.
//!
//! Each lifecycle phase that plugins participate in has its own payload type
//! and channel: [`InitEvent`] on [`INIT_CHANNEL`], [`RegisterEvent`] on
//! [`REGISTER_CHANNEL`]. Listener signatures are statically typed against
//! these payloads; there is no dynamically-typed base event to downcast.

use outset_plug::PluginEvent;

use crate::engine::CommandSet;

/// Channel the [`InitEvent`] is dispatched on.
pub const INIT_CHANNEL: &str = "cli:init";

/// Channel the [`RegisterEvent`] is dispatched on.
pub const REGISTER_CHANNEL: &str = "cli:register";

/// Dispatched once when the lifecycle initializes.
///
/// Carries no payload: listeners received their configuration when they were
/// wired up, and the command tree is not yet open for registration.
#[derive(Debug, Default)]
pub struct InitEvent;

impl PluginEvent for InitEvent {
    const CHANNEL: &'static str = INIT_CHANNEL;
}

/// Dispatched once when the lifecycle registers commands.
///
/// Carries the command tree so listeners can attach subcommands and bind
/// handlers before parsing begins. The tree is moved into the event for the
/// duration of the dispatch and reclaimed by the coordinator afterwards.
///
/// # Example
///
/// ```rust,ignore
/// registry.on(|event: &mut RegisterEvent| {
///     event.commands_mut().mount(Command::new("archive"), |_matches| {
///         // ...
///         Ok(())
///     });
///     Ok(())
/// });
/// ```
#[derive(Debug)]
pub struct RegisterEvent {
    commands: CommandSet,
}

impl RegisterEvent {
    /// Wraps a command set for dispatch.
    pub fn new(commands: CommandSet) -> Self {
        Self { commands }
    }

    /// Returns the command tree.
    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Returns the command tree mutably, for attaching subcommands.
    pub fn commands_mut(&mut self) -> &mut CommandSet {
        &mut self.commands
    }

    /// Unwraps the command tree after dispatch.
    pub fn into_commands(self) -> CommandSet {
        self.commands
    }
}

impl PluginEvent for RegisterEvent {
    const CHANNEL: &'static str = REGISTER_CHANNEL;
}
