//! Relay - Event
//!
//! The event envelope that flows through every pipeline, and the
//! acknowledgement tree that gives the gateway its at-least-once semantics.
//!
//! # Overview
//!
//! A receiver emits an [`Event`] carrying an arbitrary JSON payload and a
//! root acknowledgement node. Every fan-out downstream (split filters, shared
//! receiver dispatch) clones the event, which inserts a child node into the
//! tree. The receiver-level callbacks fire exactly once: with an ack when
//! every descendant acked, or with the first recorded error as soon as any
//! descendant nacks. An optional root deadline converts a stuck tree into a
//! timeout nack.
//!
//! # Example
//!
//! ```
//! use relay_event::Event;
//! use relay_tenant::TenantId;
//! use serde_json::json;
//!
//! let tid = TenantId::new("comcast", "xfi").unwrap();
//! let mut event = Event::new(tid, json!({"foo": {"bar": 1}}));
//! assert_eq!(event.get_path_value("foo.bar"), Some(&json!(1)));
//! event.set_path_value("foo.baz", json!(2), true);
//! event.ack();
//! ```

mod ack;
mod error;
mod event;
mod paths;

pub use ack::AckNode;
pub use error::AckError;
pub use event::{Event, NackFn, TermFn};
pub use paths::{get_path, set_path};
