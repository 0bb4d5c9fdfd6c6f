use anyhow::Result;
use gateway::mask_secret;

use super::{config_path, load_config, state_path};
use crate::Context;
use crate::cli::ConfigCommand;
use crate::ui;

pub fn run(ctx: &Context, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    ui::header("Configuration");

    let path = config_path(ctx)?;
    let found = if path.exists() { "" } else { " (not found)" };
    ui::kv("Config file", &format!("{}{found}", path.display()));
    ui::kv("State file", &state_path(ctx)?.display().to_string());
    println!();

    let config = load_config(ctx)?;
    let unset = || "-".to_string();
    ui::kv("org_id", &config.org_id.clone().unwrap_or_else(unset));
    ui::kv("host", &config.host.clone().unwrap_or_else(unset));
    ui::kv("protocol", &config.protocol.clone().unwrap_or_else(unset));
    ui::kv("token_type", &config.token_type.clone().unwrap_or_else(unset));
    ui::kv(
        "api_key",
        &config.api_key.as_deref().map(mask_secret).unwrap_or_else(unset),
    );
    ui::kv(
        "timeout",
        &config.timeout.map(|secs| format!("{secs}s")).unwrap_or_else(unset),
    );

    println!();
    ui::dim("Flags and CLUSTERFORM_* environment variables override the file.");
    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    match load_config(ctx)?.resolve() {
        Ok(config) => {
            ui::success(&format!("Configuration is valid ({})", config.base_url()));
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("Configuration is invalid: {e}"));
            Err(e)
        }
    }
}
