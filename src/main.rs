mod cli;

use request_correlation::{config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use rc_core::{IdGenerator, UuidGenerator};

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI
    config.server.host = host;
    config.server.port = port;
    config::validate_config(&config)?;

    tracing::info!("Starting request-correlation server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            concat!(
                "request_correlation=trace,rc_core=trace,rc_server=trace,",
                "rc_client=trace,tower_http=debug"
            )
            .to_string()
        } else {
            "request_correlation=info,rc_core=info,rc_server=info,rc_client=info,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateId => {
            println!("{}", UuidGenerator.generate());
            Ok(())
        }
        Commands::Version => {
            println!("request-correlation {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Correlation header: {}", config.correlation.header_name);
    println!(
        "  Propagation: http={} declarative={}",
        config.correlation.client.http_enabled, config.correlation.client.declarative_enabled
    );
    println!(
        "  Downstream: {}",
        config.downstream.base_url.as_deref().unwrap_or("(self)")
    );
    println!("  Tracing observer: {}", config.observers.tracing);

    Ok(())
}
