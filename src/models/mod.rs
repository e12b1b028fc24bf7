//! Core data models for the application
//!
//! This module contains the primary data structures used throughout the
//! application, separated from the logic that operates on them.
//!
//! # Usage
//!
//! ```rust
//! use nodeforge::models::{Credential, Protocol, ProxyNode};
//!
//! let node = ProxyNode::builder(Protocol::Trojan, "example.com", 443)
//!     .credential(Credential::Password("secret".to_string()))
//!     .build();
//! assert_eq!(node.name(), "Trojan-example.com:443");
//! ```

mod proxy;
mod transport;

pub use proxy::*;
pub use transport::*;
