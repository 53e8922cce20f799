use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use axum::{Extension, Router, routing::get};
use clap::Parser;
use keycloak_saml_plugin::{
    bootstrap::RealmBootstrapper,
    config::PluginConfig,
    observability,
    pki::SelfSignedCertificateFactory,
    saml::RelyingPartyRegistrationBuilder,
    security::{SamlSession, SecurityChainComposer},
};
use tower_http::trace::TraceLayer;

/// Configuration file picked up from the working directory when present.
const DEFAULT_CONFIG_FILE: &str = "keycloak-plugin.toml";

/// How often expired sessions are swept from the in-memory store.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the Keycloak SAML plugin
#[derive(Parser, Debug)]
#[command(version, about = "Keycloak SAML2 relying-party plugin", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./keycloak-plugin.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Generate the realm document and SAML credentials
    Bootstrap {
        /// Directory receiving the generated files
        #[arg(long)]
        target_dir: Option<PathBuf>,
        /// Package that receives the generated security configuration
        #[arg(long)]
        config_package: Option<String>,
        /// Keycloak realm name
        #[arg(long)]
        realm_name: Option<String>,
        /// SAML client id
        #[arg(long)]
        client_id: Option<String>,
    },
    /// Serve the demo application behind the SAML2 security chain (default)
    Serve,
    /// Print the service provider metadata
    Metadata {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref());

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Some(Command::Bootstrap {
            target_dir,
            config_package,
            realm_name,
            client_id,
        }) => {
            if let Some(target_dir) = target_dir {
                config.saml.resource_dir = target_dir.clone();
                config.bootstrap.target_dir = target_dir;
            }
            if config_package.is_some() {
                config.bootstrap.config_package = config_package;
            }
            if let Some(realm_name) = realm_name {
                config.saml.realm_name = realm_name;
            }
            if let Some(client_id) = client_id {
                config.saml.client_id = client_id;
            }
            if let Err(e) = config.validate() {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            run_bootstrap(&config);
        }
        Some(Command::Metadata { output }) => run_metadata_export(&config, output.as_deref()),
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load the explicit config file, else `./keycloak-plugin.toml`, else defaults.
fn load_config(explicit_path: Option<&Path>) -> PluginConfig {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let Some(path) = path else {
        return PluginConfig::default();
    };

    match PluginConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run_bootstrap(config: &PluginConfig) {
    let bootstrapper = RealmBootstrapper::new(config, SelfSignedCertificateFactory::default());

    match bootstrapper.run() {
        Ok(report) => {
            for path in &report.generated {
                println!("generated  {}", path.display());
            }
            for path in &report.skipped {
                println!("kept       {}", path.display());
            }
            for path in &report.set_aside {
                println!("set aside  {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("Bootstrap failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_metadata_export(config: &PluginConfig, output: Option<&Path>) {
    let xml = match RelyingPartyRegistrationBuilder::from_config(config)
        .build()
        .and_then(|registration| registration.service_provider_metadata())
    {
        Ok(xml) => xml,
        Err(e) => {
            eprintln!("Failed to build service provider metadata: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &xml) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                std::process::exit(1);
            }
            eprintln!("Service provider metadata written to {}", path.display());
        }
        None => println!("{}", xml),
    }
}

async fn run_server(config: PluginConfig) {
    if config.bootstrap.on_startup {
        run_bootstrap(&config);
    }

    let composer = match SecurityChainComposer::from_config(&config) {
        Ok(composer) => composer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build relying-party registration");
            std::process::exit(1);
        }
    };

    let sessions = composer.sessions();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup();
        }
    });

    let app = composer
        .compose(Router::new().route("/", get(home)))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(
        realm = %config.saml.realm_name,
        client_id = %config.saml.client_id,
        "Server listening on {}://{}",
        config.server.scheme(),
        bind_addr
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Landing page of the secured demo application.
async fn home(Extension(session): Extension<SamlSession>) -> String {
    let mut body = format!("Signed in as {}\n", session.name_id);
    let mut names: Vec<_> = session.attributes.keys().collect();
    names.sort();
    for name in names {
        body.push_str(&format!("{}: {}\n", name, session.attributes[name].join(", ")));
    }
    body
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_overrides_parse() {
        let args = Args::try_parse_from([
            "keycloak-saml-plugin",
            "--config",
            "plugin.toml",
            "bootstrap",
            "--target-dir",
            "/tmp/kc",
            "--realm-name",
            "corp",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("plugin.toml")));
        match args.command {
            Some(Command::Bootstrap {
                target_dir,
                realm_name,
                client_id,
                config_package,
            }) => {
                assert_eq!(target_dir, Some(PathBuf::from("/tmp/kc")));
                assert_eq!(realm_name.as_deref(), Some("corp"));
                assert_eq!(client_id, None);
                assert_eq!(config_package, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_command_is_serve() {
        let args = Args::try_parse_from(["keycloak-saml-plugin"]).unwrap();
        assert!(args.command.is_none());
    }
}
