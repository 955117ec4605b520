//! Observability
//!
//! Structured JSON logging, typed lifecycle events and mutation observer
//! hooks. Observability is read-only: nothing here can alter the outcome of
//! a mutation, and a failed log write is dropped.
//!
//! ```ignore
//! use nestedset::observability::{Logger, Event};
//!
//! Logger::info(Event::StoreOpenComplete.as_str(), &[("commits", "42")]);
//! ```

mod events;
mod hooks;
mod logger;
mod metrics;

pub use events::Event;
pub use hooks::{LoggingObserver, MutationContext, MutationKind, MutationObserver, NoopObserver, ObserverChain};
pub use logger::{Logger, Severity};
pub use metrics::{MetricsObserver, MetricsSnapshot};

/// Log a lifecycle event; fatal events go out at FATAL, the rest at INFO
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
