//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{RelayBlueprint, SETTINGS_NAMESPACE};
use dispatcher::{KEY_ENDPOINT, KEY_ESSENTIALS, KEY_ESSENTIALS_ID, KEY_SEND_SAME};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    settings: SettingsInfo,
    fields: Vec<FieldInfo>,
}

#[derive(Serialize)]
struct SettingsInfo {
    dir: String,
    namespace: &'static str,
    keys: [&'static str; 4],
}

#[derive(Serialize)]
struct FieldInfo {
    name: String,
    command: String,
    formatter: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    template: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint) -> ConfigInfo {
    let mut fields: Vec<FieldInfo> = blueprint
        .field_mapping
        .iter()
        .map(|(name, command)| {
            let kind = blueprint.field_formatters.get(name).cloned().unwrap_or_default();
            FieldInfo {
                name: name.clone(),
                command: command.clone(),
                formatter: kind.label(),
                template: kind.to_string(),
            }
        })
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        endpoint: blueprint.endpoint.clone(),
        timeout_secs: blueprint.timeout_secs,
        settings: SettingsInfo {
            dir: blueprint
                .settings_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string()),
            namespace: SETTINGS_NAMESPACE,
            keys: [KEY_SEND_SAME, KEY_ESSENTIALS, KEY_ESSENTIALS_ID, KEY_ENDPOINT],
        },
        fields,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Relay Configuration ===\n");
    println!("Version: {}", info.version);
    println!("Endpoint: {}", info.endpoint);
    match info.timeout_secs {
        Some(secs) => println!("Timeout: {}s", secs),
        None => println!("Timeout: client default"),
    }

    println!("\nLive settings:");
    println!("  File: {}/{}", info.settings.dir, info.settings.namespace);
    println!("  Keys: {}", info.settings.keys.join(", "));

    println!("\nFields ({}):", info.fields.len());
    for field in &info.fields {
        if field.template.is_empty() {
            println!("  - {} -> {}", field.name, field.command);
        } else {
            println!(
                "  - {} -> {} [{}: {}]",
                field.name, field.command, field.formatter, field.template
            );
        }
    }

    println!();
}
