pub mod config;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod mcp;
pub mod metadata;
pub mod pagination;
pub mod resources;
pub mod serve;
pub mod types;
