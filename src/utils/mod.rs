pub mod base64;
pub mod http;
pub mod matcher;
pub mod url;
pub mod value;

// Re-export common utilities
pub use matcher::{RegionMatcher, UNKNOWN_REGION};
