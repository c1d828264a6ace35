//! Reporting of isolated teardown failures.
//!
//! Done-phase callbacks are best-effort: a failing or panicking callback never
//! aborts its siblings and never surfaces to the caller. Something still has
//! to see those failures, and that something is injected at construction
//! rather than reached through a process-wide logger singleton: tests inject
//! a recording observer, applications keep the default.

/// Receives reports of Done-phase callback failures.
pub trait FailureObserver {
    /// A callback returned an error.
    fn callback_failed(&mut self, index: usize, error: &anyhow::Error);

    /// A callback panicked; `message` is the stringified panic payload.
    fn callback_panicked(&mut self, index: usize, message: &str);
}

/// Default observer forwarding reports to the `tracing` facade.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FailureObserver for TracingObserver {
    fn callback_failed(&mut self, index: usize, error: &anyhow::Error) {
        tracing::error!("done callback #{} failed: {:#}", index, error);
    }

    fn callback_panicked(&mut self, index: usize, message: &str) {
        tracing::error!("done callback #{} panicked: {}", index, message);
    }
}
