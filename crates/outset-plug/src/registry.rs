//! Listener registration and fail-fast event dispatch.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::event::PluginEvent;
use crate::options::Options;

/// Type alias for a registered listener on channel `E`.
type Listener<E> = Rc<dyn Fn(&mut E) -> Result<(), anyhow::Error>>;

/// Error returned by [`Registry::trigger`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener returned an error; dispatch was aborted at that listener.
    #[error("listener #{index} on channel {channel:?} failed: {source}")]
    Listener {
        /// The channel being dispatched when the listener failed.
        channel: &'static str,
        /// Zero-based position of the failing listener in registration order.
        index: usize,
        /// The listener's error.
        #[source]
        source: anyhow::Error,
    },
}

/// A plugin's registration surface.
///
/// Implementations wire their listeners and provided options into the
/// registry in [`setup`](Self::setup). How plugins are discovered and in what
/// order they are installed is the host application's business; the registry
/// only records the result.
///
/// # Example
///
/// ```rust
/// use outset_plug::{Plugin, PluginEvent, Registry};
///
/// struct Booted;
/// impl PluginEvent for Booted {
///     const CHANNEL: &'static str = "app:booted";
/// }
///
/// struct Greeter;
///
/// impl Plugin for Greeter {
///     fn name(&self) -> &'static str {
///         "greeter"
///     }
///
///     fn setup(&self, registry: &Registry) -> Result<(), anyhow::Error> {
///         registry.on(|_event: &mut Booted| Ok(()));
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// registry.install(&Greeter).unwrap();
/// assert_eq!(registry.installed(), vec!["greeter"]);
/// ```
pub trait Plugin {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &'static str;

    /// Wires the plugin's listeners and provided options into the registry.
    fn setup(&self, registry: &Registry) -> Result<(), anyhow::Error>;
}

/// Per-channel listener list, type-erased for storage in the channel map.
struct ChannelEntry {
    channel: &'static str,
    listeners: Vec<Box<dyn Any>>,
}

/// The plugin event registry: listener lists keyed by payload type, plus the
/// shared [`Options`] container.
///
/// Registration methods take `&self` so plugins can register through a shared
/// `Rc<Registry>`; the registry is single-threaded by design, like the CLI
/// applications it serves.
///
/// # Dispatch semantics
///
/// - Listeners on a channel run in registration order.
/// - Dispatch is fail-fast: the first listener error aborts the fan-out and
///   is returned as [`DispatchError::Listener`].
/// - The listener list is snapshotted before the fan-out begins. A listener
///   that registers another listener on the same channel does not grow the
///   in-flight dispatch; the newcomer is only seen by later triggers.
#[derive(Default)]
pub struct Registry {
    channels: RefCell<HashMap<TypeId, ChannelEntry>>,
    options: RefCell<Options>,
    installed: RefCell<Vec<&'static str>>,
}

impl Registry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener on `E`'s channel.
    pub fn on<E, F>(&self, listener: F)
    where
        E: PluginEvent,
        F: Fn(&mut E) -> Result<(), anyhow::Error> + 'static,
    {
        let listener: Listener<E> = Rc::new(listener);
        self.channels
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_insert_with(|| ChannelEntry {
                channel: E::CHANNEL,
                listeners: Vec::new(),
            })
            .listeners
            .push(Box::new(listener));
    }

    /// Delivers `event` to every listener on `E`'s channel, fail-fast.
    ///
    /// A channel with no listeners dispatches successfully as a no-op.
    pub fn trigger<E: PluginEvent>(&self, event: &mut E) -> Result<(), DispatchError> {
        // Snapshot the list and release the borrow so listeners may register
        // further listeners while the fan-out runs.
        let snapshot: Vec<Listener<E>> = {
            let channels = self.channels.borrow();
            match channels.get(&TypeId::of::<E>()) {
                Some(entry) => entry
                    .listeners
                    .iter()
                    .filter_map(|listener| listener.downcast_ref::<Listener<E>>())
                    .map(Rc::clone)
                    .collect(),
                None => return Ok(()),
            }
        };

        for (index, listener) in snapshot.iter().enumerate() {
            listener(event).map_err(|source| DispatchError::Listener {
                channel: E::CHANNEL,
                index,
                source,
            })?;
        }
        Ok(())
    }

    /// Returns the number of listeners currently registered on `E`'s channel.
    pub fn listener_count<E: PluginEvent>(&self) -> usize {
        self.channels
            .borrow()
            .get(&TypeId::of::<E>())
            .map(|entry| entry.listeners.len())
            .unwrap_or(0)
    }

    /// Runs a plugin's [`setup`](Plugin::setup) and records its name.
    pub fn install(&self, plugin: &dyn Plugin) -> Result<(), anyhow::Error> {
        plugin.setup(self)?;
        self.installed.borrow_mut().push(plugin.name());
        Ok(())
    }

    /// Names of the plugins installed so far, in installation order.
    pub fn installed(&self) -> Vec<&'static str> {
        self.installed.borrow().clone()
    }

    /// Provides a value for other plugins to retrieve with [`option`](Self::option).
    pub fn provide<T: 'static>(&self, value: T) {
        self.options.borrow_mut().set(value);
    }

    /// Retrieves a shared handle to a provided value.
    pub fn option<T: 'static>(&self) -> Option<Rc<T>> {
        self.options.borrow().get::<T>()
    }

    /// Retrieves a provided value, or fails with a descriptive error.
    pub fn option_required<T: 'static>(&self) -> Result<Rc<T>, anyhow::Error> {
        self.options.borrow().get_required::<T>()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.borrow();
        let mut names: Vec<&'static str> = channels.values().map(|e| e.channel).collect();
        names.sort_unstable();
        f.debug_struct("Registry")
            .field("channels", &names)
            .field("installed", &*self.installed.borrow())
            .finish_non_exhaustive()
    }
}
