//! Debug plugins
//!
//! A scheduled receiver that emits a fixed payload on an interval, and a
//! sender that records everything it delivers. Both keep bounded histories
//! that tests and operators can inspect.

mod factory;
mod receiver;
mod sender;

pub use factory::DebugPluginFactory;
pub use receiver::{DebugReceiver, DebugReceiverConfig};
pub use sender::{DebugDestination, DebugSender, DebugSenderConfig};
