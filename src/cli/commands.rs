use clap::{Parser, Subcommand, Args};
use crate::config::ConfigOverrides;

#[derive(Parser)]
#[command(name = "agent-manager", version, about = "Agent and task tracking server with live status notifications")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and notification server
    Serve(ServeArgs),
    /// Create a user account, typically the first superuser
    CreateUser(CreateUserArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address
    #[arg(long)]
    pub host: Option<String>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<String>,

    /// Token signing secret
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Process bridge base URL; omit to run detached
    #[arg(long)]
    pub bridge_url: Option<String>,
}

impl ServeArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database: self.db.clone(),
            secret_key: self.secret_key.clone(),
            bridge_url: self.bridge_url.clone(),
        }
    }
}

#[derive(Args, Clone)]
pub struct CreateUserArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<String>,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    /// Password (falls back to MANAGER_USER_PASSWORD)
    #[arg(long, env = "MANAGER_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub full_name: Option<String>,

    /// Grant superuser privileges
    #[arg(long)]
    pub superuser: bool,
}

impl CreateUserArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides { database: self.db.clone(), ..Default::default() }
    }
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
