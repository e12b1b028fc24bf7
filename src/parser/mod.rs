pub mod cache;
pub mod error;
pub mod explodes;
pub mod pool;
pub mod subparser;

pub use cache::ParseCache;
pub use error::ParseError;
pub use pool::{order_by_links, ParseOutcome, ParserPool};

use crate::models::ProxyNode;

/// Parse one share link into a [`ProxyNode`].
///
/// Dispatches on the scheme prefix. Unknown schemes yield
/// [`ParseError::UnsupportedProtocol`].
pub fn parse_link(link: &str) -> Result<ProxyNode, ParseError> {
    explodes::explode(link)
}
