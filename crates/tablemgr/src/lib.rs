//! Relay - Routing Table Manager
//!
//! The authoritative live set per process. Materializes declarative route
//! configurations into running pipelines, keeps plugin instances shared
//! through the registry, and reconciles the local live set against the
//! shared store.
//!
//! # Control flow
//!
//! ```text
//! add_route → resolve fragments → validate → storer.set → materialize
//!     → registry instantiates or reuses receiver/filters/sender
//!     → pipeline subscribes to the receiver fan-out
//!     → events walk the chain → sender delivers → ack propagates back
//! ```
//!
//! The [`Synchronizer`] closes the loop across a fleet: any route a peer
//! stores or deletes converges into the local live set within one tick.

mod error;
mod manager;
mod pipeline;
mod resolver;
mod sync;

pub use error::{Result, TableError};
pub use manager::{LiveRoute, RoutingTableManager, DEFAULT_ACK_TIMEOUT};
pub use relay_plugin::PluginStatus;
pub use pipeline::{PipelineState, RoutePipeline};
pub use resolver::{resolve_fragments, MAX_FRAGMENT_DEPTH};
pub use sync::{Synchronizer, SynchronizerHandle, DEFAULT_SYNC_INTERVAL};
