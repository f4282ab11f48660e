//! Runtime settings collected from flags, environment and `.env`.

use std::path::PathBuf;
use std::time::Duration;

use bandcamp_core::RetryConfig;

use crate::cli::Args;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub origin: String,
    pub credentials_path: PathBuf,
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Suppress spinners.
    pub quiet: bool,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            origin: args.origin.clone(),
            credentials_path: args.credentials.clone(),
            timeout: Duration::from_secs(args.timeout),
            retry: RetryConfig {
                max_retries: args.retries,
                ..RetryConfig::default()
            },
            quiet: args.quiet,
        }
    }
}

/// Load `.env` from the working directory if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Warning: ignoring unreadable .env file: {e}"),
    }
}
