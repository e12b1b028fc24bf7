pub mod exports;
pub mod node_manip;
pub mod subscription;
pub mod yaml;

// Re-export format converters
pub use exports::{proxy_to_clash, synthesize, ClashOptions, SynthesisError};

// Re-export node manipulation functions
pub use node_manip::{
    filter_by_keywords, region_summary, resolve_nodes, resolve_nodes_reserving, tag_regions,
    DedupKey,
};
pub use subscription::encode_links;
