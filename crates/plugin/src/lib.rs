//! Relay - Plugin
//!
//! The contracts the gateway core consumes plugins through, and the registry
//! that shares long-lived plugin instances across routes.
//!
//! # Architecture
//!
//! ```text
//! [Route A] ─┐                         ┌─→ handler A
//! [Route B] ─┼─→ PluginRegistry        │
//! [Route C] ─┘      │                  │
//!                   ├─ (kind, hash) ──→ ReceiverFanout ─→ handler B
//!                   │    refcount=3         ▲
//!                   └─ driver task ── receiver.receive(next)
//! ```
//!
//! Instances are deduplicated by `(kind, sha256(plugin, config))`; the plugin
//! `name` is a tenant-facing label, not part of the key. A shared receiver
//! sees exactly one `receive()` call; the fan-out clones each emitted event
//! once per subscriber so acknowledgement accounting stays tree-shaped.

mod error;
mod fanout;
pub mod hasher;
mod registry;
mod secret;
mod traits;

pub use error::{PluginError, Result};
pub use fanout::ReceiverFanout;
pub use registry::{PluginHandle, PluginRegistry, PluginStatus};
pub use secret::{EnvVault, StaticVault, Vault};
pub use traits::{EventHandler, Filter, PluginFactory, Receiver, Sender};
