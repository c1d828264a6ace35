//! The archive feature, packaged as a plugin.
//!
//! Nothing in `main.rs` knows the `archive` subcommand exists: the plugin
//! listens on the register channel and mounts it onto the command tree
//! itself, then finds the shared store through the registry's options at
//! handler run time.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use clap::Command;
use outset::{InitEvent, RegisterEvent};
use outset_plug::{Plugin, Registry};

use crate::store::Store;

/// Plugin contributing the `archive` subcommand.
pub struct ArchivePlugin {
    // Weak so the listener closures stored inside the registry do not keep
    // the registry itself alive.
    registry: Weak<Registry>,
}

impl ArchivePlugin {
    /// Creates the plugin against the registry it will be installed on.
    pub fn new(registry: &Rc<Registry>) -> Self {
        Self {
            registry: Rc::downgrade(registry),
        }
    }
}

impl Plugin for ArchivePlugin {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn setup(&self, registry: &Registry) -> Result<(), anyhow::Error> {
        registry.on(|_event: &mut InitEvent| {
            tracing::debug!("archive plugin ready");
            Ok(())
        });

        let handle = self.registry.clone();
        registry.on(move |event: &mut RegisterEvent| {
            let handle = handle.clone();
            event.commands_mut().mount(
                Command::new("archive").about("Move every active note to the archive"),
                move |_matches| {
                    let registry = handle
                        .upgrade()
                        .ok_or_else(|| anyhow::anyhow!("plugin registry dropped"))?;
                    let store = registry.option_required::<RefCell<Store>>()?;
                    let moved = store.borrow_mut().archive_all();
                    println!("archived {moved} note(s)");
                    Ok(())
                },
            );
            Ok(())
        });

        Ok(())
    }
}
