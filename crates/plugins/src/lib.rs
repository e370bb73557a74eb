//! Relay - Plugins
//!
//! Built-in receiver and sender plugins. Production integrations (queue
//! consumers, chat webhooks, ...) live out of tree and are consumed through
//! the contracts in `relay-plugin`; this crate carries the `debug` pair used
//! for diagnostics, smoke tests, and the integration suite.

pub mod debug;

pub use debug::{DebugPluginFactory, DebugReceiver, DebugSender};
