//! Survey Front - serves a survey single-page app and its JSON API.
//!
//! This binary parses the command line, loads the `CONFIG` document and
//! starts the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_front::{
    config::{AuthMode, CheckConfig, Cli, Command, ServeConfig, SignConfig, SignOutputFormat},
    create_router, SignedTokenAuth,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // The document must be valid before anything is bound
    let app_config = match config.load_app_config() {
        Ok(app_config) => app_config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Title: {}", app_config.title());
    match app_config.question_count() {
        Some(count) => info!("  Questions: {}", count),
        None => warn!("  Questions: not a list or mapping"),
    }
    info!("  Static assets: {}", config.static_dir.display());
    if !config.static_dir.join("index.html").is_file() {
        warn!(
            "  No index.html in {}; the root redirect will lead to a 404",
            config.static_dir.display()
        );
    }

    match config.auth_mode {
        AuthMode::Proxy => {
            info!(
                "  Auth: reverse proxy headers ({}, {})",
                config.user_header, config.groups_header
            );
            warn!("        Make sure the proxy strips these headers from client requests");
        }
        AuthMode::Token => info!("  Auth: signed bearer tokens"),
    }

    let router_config = match config.router_config() {
        Ok(router_config) => router_config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(app_config, router_config);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/config", addr);
    info!("");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "survey_front=debug,tower_http=debug"
    } else {
        "survey_front=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = SignedTokenAuth::new(&config.secret);
    let groups = config.trimmed_groups();
    let token = auth.issue(config.user.trim(), &groups, Duration::from_secs(config.ttl));

    match config.format {
        SignOutputFormat::Token => println!("{}", token),
        SignOutputFormat::Header => println!("Authorization: Bearer {}", token),
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "user": config.user.trim(),
                "groups": groups,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    println!("Survey Front Configuration Check");
    println!("════════════════════════════════");
    println!();

    let app_config = match config.load_app_config() {
        Ok(app_config) => app_config,
        Err(e) => {
            println!("✗ CONFIG: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("✓ Title: {}", app_config.title());
    match app_config.question_count() {
        Some(count) => println!("✓ Questions: {}", count),
        None => println!("! Questions: present, but not a list or mapping"),
    }

    if config.show_questions {
        println!();
        match serde_json::to_string_pretty(app_config.questions()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                println!("✗ Could not render questions: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
