//! Typed plugin event registry for clap-based CLIs.
//!
//! `outset-plug` provides the event side of a pluggable command-line
//! application: a [`Registry`] that plugins register listeners on, a
//! [`PluginEvent`] trait that ties each event type to a named channel, and an
//! [`Options`] container through which plugins provide values to one another.
//!
//! # Design
//!
//! Every channel carries exactly one payload type. A listener for
//! `RegisterEvent` is written against `&mut RegisterEvent`, not against a
//! dynamically-typed base event that has to be downcast by hand. The channel
//! name lives on the payload type itself ([`PluginEvent::CHANNEL`]), so
//! registration and dispatch can never disagree about which channel an event
//! belongs to.
//!
//! Dispatch is synchronous and fail-fast: listeners run in registration order
//! on the calling thread, and the first listener error aborts the fan-out.
//!
//! # Example
//!
//! ```rust
//! use outset_plug::{PluginEvent, Registry};
//!
//! struct CacheWarmed {
//!     entries: usize,
//! }
//!
//! impl PluginEvent for CacheWarmed {
//!     const CHANNEL: &'static str = "cache:warmed";
//! }
//!
//! let registry = Registry::new();
//! registry.on(|event: &mut CacheWarmed| {
//!     event.entries += 10;
//!     Ok(())
//! });
//!
//! let mut event = CacheWarmed { entries: 0 };
//! registry.trigger(&mut event).unwrap();
//! assert_eq!(event.entries, 10);
//! ```

mod event;
mod options;
mod registry;

pub use event::PluginEvent;
pub use options::Options;
pub use registry::{DispatchError, Plugin, Registry};
