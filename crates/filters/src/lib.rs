//! Relay - Filters
//!
//! The filter chain executor and the built-in filter set.
//!
//! # Chain composition
//!
//! ```text
//! [e0] → [match] → [split] → ... → [surviving events]
//! ```
//!
//! Execution is concat-map over the event set: each filter consumes one event
//! and emits zero or more. An empty set terminates the chain early. Filters
//! that drop an event ack it; filters that fail it nack it; filters that fan
//! out emit clones so acknowledgement accounting stays tree-shaped.
//!
//! # Built-ins
//!
//! - `match` - keep or drop events by recursive pattern match
//! - `split` - fan an array out into one event per element
//! - `transform` - declarative tree rewrite with `{path}` references
//! - `dedup` - drop events whose fingerprint was seen within a window
//! - `modify` - upper/lowercase string leaves at listed paths
//! - `ws` - splice the result of a synchronous HTTP call into the payload

mod chain;
mod config;
mod dedup;
mod factory;
mod match_filter;
mod modify;
mod split;
mod transform;
mod ws;

pub use chain::FilterChain;
pub use dedup::{DedupConfig, DedupFilter};
pub use factory::{BuiltinFilterFactory, BUILTIN_FILTER_KINDS};
pub use match_filter::{MatchConfig, MatchFilter, MatchMode};
pub use modify::{ModifyConfig, ModifyFilter};
pub use split::{SplitConfig, SplitFilter};
pub use transform::{TransformConfig, TransformFilter};
pub use ws::{WsConfig, WsFilter};
