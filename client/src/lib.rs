//! # Canvas Client Library
//!
//! Terminal client for the shared character canvas. It keeps a local
//! replica of the server's state ([`view`]) and drives a line-oriented
//! session over the wire protocol ([`network`]): register with a display
//! name, claim cells, and watch everyone else's edits arrive live.
//!
//! The presentation is deliberately plain text; all authority lives on the
//! server, and this client never validates more than it has to.

pub mod network;
pub mod view;
