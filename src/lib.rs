pub mod generator;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod settings;
pub mod utils;

// Re-export the main node types for easier access
pub use models::{Credential, Protocol, ProxyNode, ProxyNodeBuilder};
pub use parser::{parse_link, ParseError};

// Re-export the pipeline entry points
pub use pipeline::{ConfigUpdater, PipelineError};
pub use settings::Settings;
