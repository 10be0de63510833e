use std::env;
use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio::net::TcpListener;
use tracing::{debug, info};

use illuminate::api::{self, AppState};
use illuminate::auth::{Claims, ExtensionAuth, MAX_TOKEN_TTL_SECS, PubSubPerms, Role};
use illuminate::config::AppConfig;
use illuminate::dispatch::{Dispatcher, ExtensionMessageClient};
use illuminate::registry::SessionRegistry;

const APP_NAME: &str = "illuminate";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.common);

    match cli.command {
        Command::Serve(cmd) => serve(&cli.common, cmd),
        Command::IssueToken(cmd) => issue_token(&cli.common, cmd),
        Command::Config => print_config(&cli.common),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), APP_NAME, &mut io::stdout());
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Illuminate - game state relay for stream extensions.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true, env = "ILLUMINATE_CONFIG")]
    config: Option<PathBuf>,
    /// Base64 extension secret
    #[arg(long, global = true, env = "EBS_SECRET", hide_env_values = true)]
    secret: Option<String>,
    /// Extension client id
    #[arg(long, global = true, env = "CLIENT_ID")]
    client_id: Option<String>,
    /// Reduce output to only errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the relay HTTP server
    Serve(ServeCommand),
    /// Mint a signed extension token for local testing
    IssueToken(IssueTokenCommand),
    /// Print the effective configuration (secret redacted)
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
    /// Directory served under /dist
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct IssueTokenCommand {
    /// Channel the token is scoped to
    #[arg(long)]
    channel: String,
    /// Token role
    #[arg(long, default_value = "broadcaster")]
    role: Role,
    /// User id claim (defaults to the channel id)
    #[arg(long)]
    user: Option<String>,
    /// Lifetime in seconds (defaults to extension.token_ttl_secs)
    #[arg(long)]
    ttl: Option<i64>,
}

impl CommonOpts {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        if self.trace {
            return "trace";
        }
        if self.debug {
            return "debug";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn init_logging(common: &CommonOpts) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = common.log_level();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

    if common.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
        return;
    }

    let force_color =
        matches!(common.color, ColorOption::Always) || env::var_os("FORCE_COLOR").is_some();
    let disable_color = matches!(common.color, ColorOption::Never)
        || env::var_os("NO_COLOR").is_some()
        || (!force_color && !io::stderr().is_terminal());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(!disable_color),
        )
        .try_init()
        .ok();
}

/// Load config and apply the global CLI overrides.
fn load_config(common: &CommonOpts) -> Result<AppConfig> {
    let mut config = AppConfig::load(common.config.as_deref()).context("loading configuration")?;
    if let Some(secret) = &common.secret {
        config.extension.secret = secret.clone();
    }
    if let Some(client_id) = &common.client_id {
        config.extension.client_id = client_id.clone();
    }
    Ok(config)
}

fn extension_auth(config: &AppConfig) -> Result<ExtensionAuth> {
    ExtensionAuth::from_base64_secret(&config.extension.secret, config.extension.token_ttl_secs)
        .context("decoding extension secret")
}

#[tokio::main]
async fn serve(common: &CommonOpts, cmd: ServeCommand) -> Result<()> {
    let mut config = load_config(common)?;
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(dir) = cmd.static_dir {
        config.server.static_dir = Some(dir);
    }
    config.validate().context("validating configuration")?;
    debug!("effective config: {:#?}", config.redacted());

    let auth = extension_auth(&config)?;
    let transport = ExtensionMessageClient::new(
        config.extension.api_base_url.clone(),
        config.extension.client_id.clone(),
        Duration::from_secs(config.extension.request_timeout_secs),
    )
    .context("building broadcast API client")?;
    let dispatcher = Arc::new(
        Dispatcher::new(auth.clone(), Arc::new(transport))
            .with_max_message_bytes(config.extension.max_message_bytes),
    );
    let registry = Arc::new(SessionRegistry::new());

    let state = AppState::new(registry, Arc::clone(&dispatcher), auth);
    let app = api::create_router(state, config.server.static_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;
    info!("Illuminate relay listening on http://{}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    if dispatcher.shutdown(grace).await {
        info!("Shutdown complete");
    }
    Ok(())
}

fn issue_token(common: &CommonOpts, cmd: IssueTokenCommand) -> Result<()> {
    let config = load_config(common)?;
    if config.extension.secret.trim().is_empty() {
        bail!("extension secret is not configured (set EBS_SECRET or extension.secret)");
    }
    let auth = extension_auth(&config)?;

    let ttl = cmd.ttl.unwrap_or(config.extension.token_ttl_secs);
    if ttl > MAX_TOKEN_TTL_SECS {
        bail!("--ttl must be at most {MAX_TOKEN_TTL_SECS} seconds");
    }
    let exp = Utc::now()
        .timestamp()
        .checked_add(ttl)
        .context("token expiry overflows")?;
    let user_id = cmd.user.unwrap_or_else(|| cmd.channel.clone());
    let claims = Claims {
        exp,
        opaque_user_id: Some(format!("U{user_id}")),
        user_id: Some(user_id),
        role: cmd.role,
        channel_id: Some(cmd.channel),
        pubsub_perms: (cmd.role == Role::External).then(PubSubPerms::send_all),
    };

    let token = auth.sign(&claims).context("signing token")?;
    println!("{token}");
    Ok(())
}

fn print_config(common: &CommonOpts) -> Result<()> {
    let config = load_config(common)?;
    let rendered =
        toml::to_string_pretty(&config.redacted()).context("serializing configuration")?;
    print!("{rendered}");
    Ok(())
}
