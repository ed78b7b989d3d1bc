// Main entry point
use clap::Parser;
use colored::Colorize;
use openapi_korea::infrastructure::config::{self, Config, Logging};
use openapi_korea::interfaces::cli::Cli;
use openapi_korea::interfaces::mcp::server;
use openapi_korea::{AppState, Dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        let path = config::generate_config_sample(cli.config.as_deref())?;
        println!("Generated config file at: {}", path.display());
        return Ok(());
    }

    let loaded = config::load_config(cli.config.as_deref())?;
    let config = loaded.config;

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }
    if let Some(warning) = loaded.warning {
        tracing::warn!("{}", warning);
    }

    let state = AppState::new(config.clone());
    if state.is_initialized() {
        tracing::info!("OpenAPI Korea server started");
    } else {
        tracing::warn!(
            "No service key configured. Set {} or service_key in the config file.",
            config::SERVICE_KEY_ENV
        );
    }
    let dispatcher = Dispatcher::new(state);

    if cli.status {
        print_status(&dispatcher, &config, cli.config.as_deref());
        return Ok(());
    }
    if let Some(uri) = &cli.read {
        let content = dispatcher.read_resource(uri).await;
        println!("{}", content.text);
        return Ok(());
    }
    if let Some(tool) = &cli.call {
        let args: serde_json::Value = serde_json::from_str(&cli.args)?;
        let output = dispatcher.call_tool(tool, &args).await;
        println!("{}", output.text);
        if output.is_error {
            std::process::exit(1);
        }
        return Ok(());
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = server::serve(dispatcher, stdin, stdout) => {
            result?;
            tracing::info!("stdin closed, shutting down");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                eprintln!("Failed to listen for shutdown signal: {}", e);
            } else {
                eprintln!("\nInterrupted, shutting down...");
            }
        }
    }

    Ok(())
}

/// Initialize logging with path and level configuration
fn init_logging(logging: &Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter_directive()));

    if let Some(path) = &logging.path {
        if !path.is_empty() {
            // Log to file
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
            return Ok(());
        }
    }

    // stdout carries the protocol, so default to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn print_status(dispatcher: &Dispatcher, config: &Config, explicit: Option<&std::path::Path>) {
    let state = dispatcher.state();

    println!("{}", "openapi-korea Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config: {}",
        explicit
            .map(|p| p.display().to_string())
            .or_else(|| config::get_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "Not found".to_string())
    );

    if state.is_initialized() {
        println!("Service key: {}", "Configured".green());
    } else {
        println!("Service key: {}", "Not configured".red());
    }

    println!("Upstream: {}", config.network.base_url);
    println!(
        "Cache TTL: {}s (resources {})",
        state.signature_cache.ttl().as_secs(),
        match state.resource_cache.ttl() {
            Some(ttl) => format!("{}s", ttl.as_secs()),
            None => "kept until refreshed".to_string(),
        }
    );
    println!(
        "Pagination: {} per page, at most {} pages",
        config.cache.page_size, config.cache.max_pages
    );

    println!();
    println!("{}", "Resources".cyan());
    for resource in dispatcher.list_resources() {
        println!("  {}  {}", resource.uri, resource.name.dimmed());
    }
    println!("{}", "Tools".cyan());
    for tool in dispatcher.list_tools() {
        println!("  {}  {}", tool.name, tool.description.dimmed());
    }
}
