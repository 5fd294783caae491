use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fetchgate",
    about = "fetchgate - request interception proxy for mock controllers",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "FETCHGATE_PORT", help = "Override the configured port")]
    pub port: Option<u16>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the proxy server (default if no command specified)")]
    Serve {
        #[arg(short, long, env = "FETCHGATE_PORT")]
        port: Option<u16>,

        #[arg(short, long, env = "FETCHGATE_SCOPE", help = "Registration scope URL")]
        scope: Option<String>,
    },

    #[command(about = "Print the integrity checksum controllers must report")]
    Checksum,

    #[command(about = "Show status of a running server")]
    Status {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(subcommand, about = "View configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Print the configuration file path")]
    Path,

    #[command(about = "Set a configuration value")]
    Set {
        #[arg(help = "Configuration key (e.g., 'port', 'scope', 'request_timeout_ms')")]
        key: String,

        #[arg(help = "New value")]
        value: String,
    },
}
