//! npmdash Server
//!
//! HTTP backend for a dashboard over Nginx Proxy Manager proxy hosts.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use npmdash_core::tracing_init::init_tracing;
use npmdash_server::routes::{build_router, cors_layer};
use npmdash_server::{AppState, Settings};

#[derive(Parser, Debug)]
#[command(name = "npmdash-server")]
#[command(version, about = "Dashboard backend over the Nginx Proxy Manager API")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    addr: SocketAddr,

    /// Default NPM base URL; an admin override in the config file wins.
    #[arg(long, default_value = "http://127.0.0.1:81", env = "NPM_BASE_URL")]
    npm_base_url: String,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = 10, env = "NPM_TIMEOUT")]
    npm_timeout: u64,

    #[arg(long, default_value = "./npm_token.json", env = "NPM_TOKEN_FILE")]
    token_file: PathBuf,

    #[arg(long, default_value = "./dashboard_links_meta.json", env = "DASH_META_FILE")]
    meta_file: PathBuf,

    #[arg(long, default_value = "./dashboard_config.json", env = "DASH_CONFIG_FILE")]
    config_file: PathBuf,

    #[arg(
        long,
        default_value = "./dashboard_links_cache.json",
        env = "DASH_LINKS_CACHE_FILE"
    )]
    cache_file: PathBuf,

    /// Admin username. Admin features are disabled unless both user and
    /// password are set.
    #[arg(long, default_value = "", env = "ADMIN_USER")]
    admin_user: String,

    #[arg(long, default_value = "", env = "ADMIN_PASS", hide_env_values = true)]
    admin_pass: String,

    /// Comma-separated list of allowed CORS origins, or `*`.
    #[arg(long, default_value = "*", env = "DASH_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            default_npm_base_url: self.npm_base_url.clone(),
            npm_timeout: Duration::from_secs(self.npm_timeout),
            token_file: self.token_file.clone(),
            meta_file: self.meta_file.clone(),
            config_file: self.config_file.clone(),
            cache_file: self.cache_file.clone(),
            admin_user: self.admin_user.clone(),
            admin_pass: self.admin_pass.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("npmdash_server=info,npmdash_core=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting npmdash-server"
    );

    let state = AppState::from_settings(&args.settings())?;
    if !state.admin.is_configured() {
        info!("Admin credentials not set; admin routes are disabled");
    }

    let origins: Vec<String> = args
        .cors_origins
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    let app = build_router(state).layer(cors_layer(&origins));

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
