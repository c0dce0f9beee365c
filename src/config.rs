//! Configuration management for Cloud Gallery.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks and defaults for everything optional.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use cloud_gallery::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Sign(config) => println!("Signing {} params", config.params.len()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `GALLERY_HOST` - Server bind address (default: 0.0.0.0)
//! - `GALLERY_PORT` - Server port (default: 3000)
//! - `SUPABASE_URL` - Session store project URL (required)
//! - `SUPABASE_ANON_KEY` - Session store public key (required)
//! - `CLOUDINARY_CLOUD_NAME` - Media host cloud name (required)
//! - `CLOUDINARY_API_KEY` - Media host public API key (required)
//! - `CLOUDINARY_API_SECRET` - Media host API secret, never sent to clients (required)
//! - `CLOUDINARY_BASE_URL` - Media host API root (default: https://api.cloudinary.com)
//! - `CLOUDINARY_UPLOAD_FOLDER` - Folder every upload is signed into
//! - `GALLERY_COOKIE_SECRET` - Key for signing session cookies (required)
//! - `GALLERY_SECURE_COOKIES` - Mark session cookies `Secure`
//! - `GALLERY_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::media::{image_endpoint, DEFAULT_CLOUDINARY_BASE_URL};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default timeout for session store calls, in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Shortest accepted cookie secret.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Cloud Gallery - a private image gallery backed by hosted auth and media storage.
#[derive(Parser, Debug, Clone)]
#[command(name = "cloud-gallery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the gallery server.
    Serve(ServeConfig),

    /// Mint (or check) an upload signature offline.
    Sign(SignConfig),
}

/// Options for `cloud-gallery serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    // =========================================================================
    // Session Store
    // =========================================================================
    /// Session store project URL.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,

    /// Session store public (anon) key.
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: String,

    /// Timeout for session store calls, in seconds.
    #[arg(long, default_value_t = DEFAULT_STORE_TIMEOUT_SECS, env = "SUPABASE_TIMEOUT")]
    pub supabase_timeout: u64,

    // =========================================================================
    // Media Host
    // =========================================================================
    /// Media host cloud name.
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: String,

    /// Media host public API key.
    #[arg(long, env = "CLOUDINARY_API_KEY")]
    pub cloudinary_api_key: String,

    /// Media host API secret. Used for signing only; never leaves the server.
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: String,

    /// Media host API root.
    #[arg(long, default_value = DEFAULT_CLOUDINARY_BASE_URL, env = "CLOUDINARY_BASE_URL")]
    pub cloudinary_base_url: String,

    /// Folder every upload is signed into.
    #[arg(long, env = "CLOUDINARY_UPLOAD_FOLDER")]
    pub upload_folder: Option<String>,

    // =========================================================================
    // Sessions
    // =========================================================================
    /// Secret for signing session cookies.
    #[arg(long, env = "GALLERY_COOKIE_SECRET", hide_env_values = true)]
    pub cookie_secret: String,

    /// Mark session cookies `Secure` (serve over HTTPS).
    #[arg(long, default_value_t = false, env = "GALLERY_SECURE_COOKIES")]
    pub secure_cookies: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GALLERY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            (&self.supabase_url, "Session store URL is required. Set --supabase-url or SUPABASE_URL"),
            (
                &self.supabase_anon_key,
                "Session store key is required. Set --supabase-anon-key or SUPABASE_ANON_KEY",
            ),
            (
                &self.cloudinary_cloud_name,
                "Cloud name is required. Set --cloudinary-cloud-name or CLOUDINARY_CLOUD_NAME",
            ),
            (
                &self.cloudinary_api_key,
                "API key is required. Set --cloudinary-api-key or CLOUDINARY_API_KEY",
            ),
            (
                &self.cloudinary_api_secret,
                "API secret is required. Set --cloudinary-api-secret or CLOUDINARY_API_SECRET",
            ),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(message.to_string());
            }
        }

        for (url, name) in [
            (&self.supabase_url, "supabase_url"),
            (&self.cloudinary_base_url, "cloudinary_base_url"),
        ] {
            url::Url::parse(url).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
        }

        if self.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(format!(
                "Cookie secret must be at least {} bytes. Set --cookie-secret or GALLERY_COOKIE_SECRET",
                MIN_COOKIE_SECRET_LEN
            ));
        }

        if self.supabase_timeout == 0 {
            return Err("supabase_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Direct-upload endpoint browsers post files to.
    pub fn upload_url(&self) -> String {
        image_endpoint(&self.cloudinary_base_url, &self.cloudinary_cloud_name, "upload")
    }
}

/// Output of `cloud-gallery sign`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    /// Just the hex signature
    #[default]
    Signature,

    /// `{ signature, timestamp, params }`
    Json,
}

/// Options for `cloud-gallery sign`.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Media host API secret.
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Unix timestamp to sign (default: now).
    #[arg(long)]
    pub timestamp: Option<i64>,

    /// Extra signed parameter, as key=value. Repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Check this signature instead of printing a new one.
    #[arg(long)]
    pub verify: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Signature)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret is required. Set --secret or CLOUDINARY_API_SECRET".to_string());
        }
        if self.verify.is_some() && self.timestamp.is_none() {
            return Err("--verify needs the --timestamp that was signed".to_string());
        }
        Ok(())
    }

    /// Parse `--param key=value` pairs.
    pub fn parse_params(&self) -> Result<Vec<(String, String)>, String> {
        self.params
            .iter()
            .map(|param| {
                let (key, value) = param
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid parameter '{}': expected key=value", param))?;
                if key.is_empty() {
                    return Err(format!("Invalid parameter '{}': empty key", param));
                }
                if key == "timestamp" {
                    return Err("Use --timestamp instead of --param timestamp=...".to_string());
                }
                Ok((key.to_string(), value.to_string()))
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
