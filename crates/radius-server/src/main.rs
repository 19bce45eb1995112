use clap::Parser;
use radius_server::{backend_from_config, Config, RadiusServer, ServerConfig};
use std::process;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RFC 2865 RADIUS authentication server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-server")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit (doesn't start server)
    #[arg(short, long)]
    validate: bool,

    /// Default shared secret, overriding the configuration file
    #[arg(long, env = "RADIUS_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Listen port, overriding the configuration file
    #[arg(short, long, env = "RADIUS_PORT")]
    port: Option<u16>,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            if cli.validate {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            init_tracing("info");
            warn!("Could not load config file {}: {}", cli.config_path, e);
            info!("Creating example configuration at: {}", cli.config_path);

            if let Err(e) = Config::example().to_file(&cli.config_path) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }

            info!("Please edit {} and restart the server", cli.config_path);
            process::exit(0);
        }
    };

    if let Some(secret) = cli.secret {
        config.secret = secret;
    }
    if let Some(port) = cli.port {
        config.listen_port = port;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        process::exit(1);
    }

    if cli.validate {
        println!("Configuration OK");
        println!("  Listen: {}:{}", config.listen_address, config.listen_port);
        println!("  Clients: {}", config.clients.len());
        match config.ldap {
            Some(ref ldap) => println!("  Backend: ldap ({})", ldap.url),
            None => println!("  Backend: static ({} users)", config.users.len()),
        }
        println!("  Backend timeout: {}s", config.backend_timeout_secs);
        if let Some(ref path) = config.audit_log_path {
            println!("  Audit log: {}", path);
        }
        process::exit(0);
    }

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    info!("RADIUS server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config_path);

    if config.clients.is_empty() {
        warn!("No authorized clients configured; accepting requests from any address");
    } else {
        for client in &config.clients {
            let name = client.name.as_deref().unwrap_or("(unnamed)");
            info!(enabled = client.enabled, "Client {} - {}", client.address, name);
        }
    }

    let backend = backend_from_config(&config);
    info!(backend = backend.name(), "Authentication backend ready");

    let server_config = match ServerConfig::from_config(config, backend) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    match server_config.audit_logger.file_path() {
        Some(path) => info!("Audit log: {}", path),
        None => info!("Audit log disabled"),
    }

    let server = match RadiusServer::new(server_config).await {
        Ok(srv) => srv,
        Err(e) => {
            error!("Failed to create server: {}", e);
            process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            // Dropping the sender would stop the server
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = server.run_with_shutdown(shutdown_rx).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
