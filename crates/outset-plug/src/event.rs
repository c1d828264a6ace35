//! The event trait tying payload types to named channels.

/// A payload type deliverable through a [`Registry`](crate::Registry) channel.
///
/// Each implementing type *is* its channel: listeners subscribe with the
/// payload type, and [`CHANNEL`](Self::CHANNEL) names the channel in error
/// reports and diagnostics. Conventionally the name is
/// `"<component>:<event>"`, e.g. `"cli:register"`.
///
/// # Example
///
/// ```rust
/// use outset_plug::PluginEvent;
///
/// struct ConfigLoaded {
///     path: String,
/// }
///
/// impl PluginEvent for ConfigLoaded {
///     const CHANNEL: &'static str = "config:loaded";
/// }
/// ```
pub trait PluginEvent: 'static {
    /// The channel this event type is dispatched on.
    const CHANNEL: &'static str;
}
