pub mod cli;
pub mod mcp;
