// src/runtime/mod.rs
// ============================================================================
// Module: Actiongate Runtime
// Description: The pattern router, dispatcher, gated executor, and instance.
// Purpose: Host everything that turns registered (pattern, action) pairs
//          into a running dispatcher applications can call.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime modules implement components C1–C9 of the dispatcher: pattern
//! index, action registry, action cache, gated executor, dispatcher,
//! delegate factory, subscription bus, options, and the instance that ties
//! them together.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod action_cache;
pub mod action_registry;
pub mod delegate;
pub mod dispatcher;
pub mod gated_executor;
pub mod instance;
pub mod options;
pub mod pattern_index;
pub mod subscription;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use action_cache::ActionCache;
pub use action_cache::CacheEntry;
pub use action_registry::ActionRegistry;
pub use action_registry::RegisteredAction;
pub use action_registry::Validator;
pub use delegate::Delegate;
pub use dispatcher::ActionHandler;
pub use dispatcher::Continuation;
pub use gated_executor::Gate;
pub use gated_executor::GateTask;
pub use instance::Instance;
pub use options::ActCacheOptions;
pub use options::DebugOptions;
pub use options::InternalOptions;
pub use options::LegacyOptions;
pub use options::Options;
pub use options::OptionsPatch;
pub use options::StatsOptions;
pub use options::StrictOptions;
pub use options::TraceOptions;
pub use pattern_index::PatternIndex;
pub use subscription::Direction;
pub use subscription::SubscriberFn;
pub use subscription::SubscriptionBus;
