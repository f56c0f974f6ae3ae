// src/lib.rs
// ============================================================================
// Module: Actiongate Library
// Description: Public API surface for the pattern-matched action dispatcher.
// Purpose: Expose the instance, delegate, options, and error types applications need.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Actiongate routes plain key/value messages to registered handlers chosen
//! by matching the message's attributes against registered patterns — the
//! most-specific match wins. Applications compose business logic as
//! `(pattern, action)` pairs and dispatch through one [`Instance`] per
//! process (or a scoped [`Delegate`] of it); they never name a handler
//! directly.
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//!
//! use actiongate::Instance;
//!
//! let instance = Instance::new();
//! let pattern: serde_json::Map<String, serde_json::Value> =
//!     [("role".to_string(), json!("math")), ("cmd".to_string(), json!("sum"))].into_iter().collect();
//! instance
//!     .add(
//!         &pattern,
//!         Arc::new(|_this, msg, done| {
//!             let x = msg.get("x").and_then(serde_json::Value::as_i64).unwrap_or(0);
//!             let y = msg.get("y").and_then(serde_json::Value::as_i64).unwrap_or(0);
//!             done(Ok(json!({ "answer": x + y })));
//!         }),
//!         None,
//!         "sum",
//!     )
//!     .expect("pattern has matchable keys");
//!
//! let message: serde_json::Map<String, serde_json::Value> =
//!     [("role".to_string(), json!("math")), ("cmd".to_string(), json!("sum")), ("x".to_string(), json!(2)), ("y".to_string(), json!(3))]
//!         .into_iter()
//!         .collect();
//! instance.act(message, Box::new(|result| { let _ = result; }));
//! ```

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::ActError;
pub use core::ActId;
pub use core::ActionId;
pub use core::ActionMeta;
pub use core::CallMeta;
pub use core::ErrorKind;
pub use core::Message;
pub use core::Pattern;
pub use core::PatternStatsSnapshot;
pub use core::PriorCtxt;
pub use core::ReservedAttrs;
pub use core::StatsSnapshot;
pub use core::TxId;

pub use interfaces::ErrorHandler;
pub use interfaces::EventSink;
pub use interfaces::LifecycleEvent;
pub use interfaces::TracingEventSink;

pub use runtime::ActionHandler;
pub use runtime::Continuation;
pub use runtime::Delegate;
pub use runtime::Direction;
pub use runtime::Instance;
pub use runtime::Options;
pub use runtime::OptionsPatch;
pub use runtime::RegisteredAction;
pub use runtime::Validator;
