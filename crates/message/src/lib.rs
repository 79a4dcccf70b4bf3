//! Sluice - Message
//!
//! The message model shared by every pipeline stage.
//!
//! # Overview
//!
//! A [`Message`] is the atomic unit flowing through a pipeline. It is either
//! a data message carrying an opaque byte payload plus a metadata sidecar, or
//! a control message that signals an end-of-stream boundary ("no more data
//! will arrive on this branch, flush now").
//!
//! Payloads that contain JSON text can be read and modified through
//! dot-notation paths:
//!
//! ```
//! use sluice_message::Message;
//!
//! let mut msg = Message::from_payload(r#"{"user":{"id":7}}"#);
//! assert_eq!(msg.get_value("user.id"), Some(7u64.into()));
//!
//! msg.set_value("user.name", "ada".into()).unwrap();
//! assert_eq!(msg.get_value("user.name"), Some("ada".into()));
//! ```
//!
//! Reading a path that does not exist returns `None` rather than an error;
//! transforms routinely probe for optional fields.

mod error;
mod message;
mod path;

pub use error::MessageError;
pub use message::{Message, Metadata};
pub use path::{bytes_to_value, value_to_bytes, value_to_string};
