use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use fetchgate_core::modules::config as core_config;
use fetchgate_core::proxy::{integrity_checksum, InterceptorStatus};
use fetchgate_types::ProxyConfig;

use crate::cli::ConfigCommands;

pub fn handle_config_command(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => show_config(json),
        ConfigCommands::Path => {
            println!("{}", core_config::config_path()?.display());
            Ok(())
        },
        ConfigCommands::Set { key, value } => set_config_value(&key, &value),
    }
}

/// A parsed config assignment, validated before anything is written.
#[derive(Debug, PartialEq)]
enum ConfigValue {
    Port(u16),
    AllowLanAccess(bool),
    Scope(String),
    RequestTimeoutMs(u64),
    ControlTimeoutMs(u64),
    UpstreamTimeoutSecs(u64),
    BypassHeader(String),
}

impl ConfigValue {
    fn parse(key: &str, value: &str) -> Result<Self> {
        let number = |v: &str| {
            v.parse::<u64>().map_err(|_| anyhow::anyhow!("Invalid number for {}: {}", key, v))
        };
        Ok(match key {
            "port" => Self::Port(
                value.parse().map_err(|_| anyhow::anyhow!("Invalid port number: {}", value))?,
            ),
            "allow_lan_access" => Self::AllowLanAccess(
                value.parse().map_err(|_| anyhow::anyhow!("Invalid boolean: {}", value))?,
            ),
            "scope" => Self::Scope(value.to_string()),
            "request_timeout_ms" => Self::RequestTimeoutMs(number(value)?),
            "control_timeout_ms" => Self::ControlTimeoutMs(number(value)?),
            "upstream_timeout_secs" => Self::UpstreamTimeoutSecs(number(value)?),
            "bypass_header" => Self::BypassHeader(value.to_ascii_lowercase()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        })
    }

    fn apply(self, config: &mut ProxyConfig) {
        match self {
            Self::Port(v) => config.port = v,
            Self::AllowLanAccess(v) => config.allow_lan_access = v,
            Self::Scope(v) => config.scope = v,
            Self::RequestTimeoutMs(v) => config.request_timeout_ms = v,
            Self::ControlTimeoutMs(v) => config.control_timeout_ms = v,
            Self::UpstreamTimeoutSecs(v) => config.upstream_timeout_secs = v,
            Self::BypassHeader(v) => config.bypass_header = v,
        }
    }
}

fn set_config_value(key: &str, value: &str) -> Result<()> {
    let parsed = ConfigValue::parse(key, value)?;
    core_config::update_config(|config| parsed.apply(config))?;

    println!("{} Config updated: {} = {}", "✓".green(), key, value);
    Ok(())
}

fn show_config(json: bool) -> Result<()> {
    let config = core_config::load_config()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", "Proxy Configuration:".cyan().bold());
        println!("  Listen: {}", config.get_socket_addr());
        println!("  Scope: {}", config.scope);
        println!("  Request timeout: {}ms", config.request_timeout_ms);
        println!("  Control timeout: {}ms", config.control_timeout_ms);
        println!("  Upstream timeout: {}s", config.upstream_timeout_secs);
        println!("  Bypass header: {}", config.bypass_header);
    }
    Ok(())
}

pub fn handle_checksum() -> Result<()> {
    println!("{}", integrity_checksum());
    Ok(())
}

pub async fn handle_status(port: u16, json: bool) -> Result<()> {
    let url = format!("http://127.0.0.1:{}/api/status", port);
    let response = reqwest::get(&url)
        .await
        .map_err(|e| anyhow::anyhow!("fetchgate is not reachable at {}: {}", url, e))?;
    let status: serde_json::Value = response.error_for_status()?.json().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let interceptor: InterceptorStatus = serde_json::from_value(status["interceptor"].clone())?;

    println!("{}", "fetchgate Status".cyan().bold());
    println!("  State: {:?}", interceptor.state);
    println!("  Scope: {}", interceptor.scope);
    println!("  Open clients: {}", interceptor.open_clients);
    println!("  In flight: {}", interceptor.in_flight);
    println!("  Checksum: {}", interceptor.checksum);

    if interceptor.active_sessions.is_empty() {
        println!("  {}", "No active sessions".yellow());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Active session"]);
        for id in &interceptor.active_sessions {
            table.add_row(vec![id.to_string()]);
        }
        println!("{table}");
    }
    Ok(())
}
