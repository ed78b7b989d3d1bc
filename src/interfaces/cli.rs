use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "openapi-korea")]
#[command(about = "Sejong City open data as cached resources and tools over stdio.")]
#[command(version)]
pub struct Cli {
    /// Path to the config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,

    /// Read one resource by URI and print it
    #[arg(long, value_name = "URI", conflicts_with = "call")]
    pub read: Option<String>,

    /// Call one tool by name and print its text result
    #[arg(long, value_name = "TOOL")]
    pub call: Option<String>,

    /// JSON arguments for --call
    #[arg(long, value_name = "JSON", default_value = "{}", requires = "call")]
    pub args: String,
}
