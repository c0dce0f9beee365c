//! Cloud Gallery - a private image gallery server.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_gallery::{
    config::{Cli, Command, ServeConfig, SignConfig, SignOutputFormat},
    media::Cloudinary,
    server::{create_router, RouterConfig},
    signature::{current_timestamp, UploadAuthorization, UploadSigner},
    store::{SupabaseConfig, SupabaseStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Cloud Gallery v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Session store: {}", config.supabase_url);
    info!(
        "  Media host: {} (cloud '{}')",
        config.cloudinary_base_url, config.cloudinary_cloud_name
    );
    if let Some(ref folder) = config.upload_folder {
        info!("  Upload folder: {}", folder);
    }
    if !config.secure_cookies {
        warn!("  Session cookies are not marked Secure");
        warn!("        Enable behind HTTPS: --secure-cookies");
    }

    let store = match SupabaseStore::new(
        SupabaseConfig::new(&config.supabase_url, &config.supabase_anon_key)
            .with_timeout(Duration::from_secs(config.supabase_timeout)),
    ) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create session store client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let signer = build_signer(&config);

    let media = match Cloudinary::new(
        &config.cloudinary_base_url,
        &config.cloudinary_cloud_name,
        &config.cloudinary_api_key,
    ) {
        Ok(media) => media.with_signer(signer.clone()),
        Err(e) => {
            error!("Failed to create media host client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(store, media, signer, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    open http://{}/login", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "cloud_gallery=debug,tower_http=debug"
    } else {
        "cloud_gallery=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_signer(config: &ServeConfig) -> UploadSigner {
    let signer = UploadSigner::new(&config.cloudinary_api_secret);
    match config.upload_folder.as_deref().filter(|f| !f.is_empty()) {
        Some(folder) => signer.with_fixed_param("folder", folder),
        None => signer,
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(&config.cookie_secret)
        .with_secure_cookies(config.secure_cookies)
        .with_direct_upload(config.upload_url(), &config.cloudinary_api_key);

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config = router_config.with_tracing(!config.no_tracing);

    router_config
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    // Parse additional parameters
    let params = match config.parse_params() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let signer = params
        .iter()
        .fold(UploadSigner::new(&config.secret), |signer, (k, v)| {
            signer.with_fixed_param(k, v)
        });
    let timestamp = config.timestamp.unwrap_or_else(current_timestamp);

    if let Some(signature) = config.verify {
        let authorization = UploadAuthorization {
            signature,
            timestamp,
            params: signer.fixed_params().clone(),
        };
        return match signer.verify(&authorization) {
            Ok(()) => {
                println!("valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("invalid: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let authorization = match signer.authorize_at(timestamp) {
        Ok(authorization) => authorization,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Output based on format
    match config.format {
        SignOutputFormat::Signature => {
            println!("{}", authorization.signature);
        }
        SignOutputFormat::Json => match serde_json::to_string_pretty(&authorization) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}
