// src/interfaces/mod.rs
// ============================================================================
// Module: Actiongate Interfaces
// Description: Small trait surfaces the runtime is built against.
// Purpose: Let lifecycle observation and error handling be swapped without
//          touching the dispatcher.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The dispatcher never logs or notifies directly; it emits
//! [`LifecycleEvent`]s to every registered [`EventSink`] (`tracing` is one
//! such sink, installed by default) and consults an optional
//! [`ErrorHandler`] before delivering a failure to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::ActError;
use crate::core::CallMeta;

// ============================================================================
// SECTION: Lifecycle Events
// ============================================================================

/// A notable event in the life of an [`Instance`](crate::runtime::instance::Instance).
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An error was emitted instance-wide (not necessarily tied to one call).
    Error(Arc<ActError>),
    /// A call entered execution.
    ActIn {
        /// The call's metadata.
        meta: CallMeta,
    },
    /// A call completed successfully.
    ActOut {
        /// The call's metadata.
        meta: CallMeta,
        /// The result delivered to the caller.
        result: Value,
    },
    /// A call completed with an error.
    ActErr {
        /// The call's metadata.
        meta: CallMeta,
        /// The error delivered to the caller.
        error: Arc<ActError>,
    },
    /// An action was registered.
    Add {
        /// Canonical pattern string of the newly registered action.
        pattern: String,
    },
    /// The instance's root gate became idle and every `ready` callback fired.
    Ready,
    /// The instance finished closing.
    Close,
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Receives [`LifecycleEvent`]s as the instance runs.
///
/// Implementations must not block or panic; a sink that needs to do
/// expensive work should hand the event off (e.g. to a channel) rather than
/// process it inline.
pub trait EventSink: Send + Sync {
    /// Observes one lifecycle event.
    fn on_event(&self, event: &LifecycleEvent);
}

/// An [`EventSink`] that forwards every event to `tracing`, matching the
/// teacher crate's practice of routing structured events through `tracing`
/// rather than a bespoke logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Error(err) => tracing::error!(%err, "instance error"),
            LifecycleEvent::ActIn { meta } => {
                tracing::trace!(actid = %meta.id, pattern = %meta.pattern, "act-in");
            }
            LifecycleEvent::ActOut { meta, .. } => {
                tracing::trace!(actid = %meta.id, pattern = %meta.pattern, "act-out");
            }
            LifecycleEvent::ActErr { meta, error } => {
                tracing::warn!(actid = %meta.id, pattern = %meta.pattern, %error, "act-err");
            }
            LifecycleEvent::Add { pattern } => tracing::debug!(pattern, "add"),
            LifecycleEvent::Ready => tracing::debug!("ready"),
            LifecycleEvent::Close => tracing::info!("close"),
        }
    }
}

// ============================================================================
// SECTION: Error Handler
// ============================================================================

/// Instance-wide error handler installed via `error(handler)`.
///
/// Returning `true` suppresses delivery of the error to the call's own
/// continuation (the handler has "consumed" it), except when the failing
/// call carried `fatal$`, in which case the instance dies regardless.
pub type ErrorHandler = Arc<dyn Fn(&ActError) -> bool + Send + Sync>;
