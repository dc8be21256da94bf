//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{CliConfig, Context};

/// Register a context. The first context created becomes current.
pub fn create(name: &str, server: &str, token: Option<&str>, config_path: &Path) -> Result<()> {
    let ctx = Context {
        name: name.to_string(),
        server: server.trim_end_matches('/').to_string(),
        token: token.unwrap_or_default().to_string(),
    };
    ctx.client_config(30).validate()?;

    let mut config = CliConfig::load(config_path)?;
    config.upsert_context(ctx);
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
    config.save(config_path)?;

    println!("Context \"{name}\" created.");
    println!("  Server: {server}");
    Ok(())
}

pub fn list(config_path: &Path) -> Result<()> {
    let config = CliConfig::load(config_path)?;

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        println!("Run: ucsb context create <name> --server <url>");
        return Ok(());
    }

    println!("{:2} {:20} {:50} {:5}", "", "NAME", "SERVER", "TOKEN");
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let server = if ctx.server.is_empty() { "-" } else { &ctx.server };
        let token = if ctx.token.is_empty() { "no" } else { "yes" };
        println!("{:2} {:20} {:50} {:5}", marker, ctx.name, server, token);
    }
    Ok(())
}

pub fn use_context(name: &str, config_path: &Path) -> Result<()> {
    let mut config = CliConfig::load(config_path)?;

    if !config.contexts.iter().any(|c| c.name == name) {
        anyhow::bail!("Context \"{name}\" not found. Run `ucsb context list` to see available contexts.");
    }

    config.current_context = name.to_string();
    config.save(config_path)?;
    println!("Switched to context \"{name}\".");
    Ok(())
}

/// Change the server or token of a context. An empty token clears it.
pub fn set(name: &str, server: Option<&str>, token: Option<&str>, config_path: &Path) -> Result<()> {
    let mut config = CliConfig::load(config_path)?;

    let ctx = config
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("Context \"{name}\" not found."))?;

    if let Some(s) = server {
        ctx.server = s.trim_end_matches('/').to_string();
    }
    if let Some(t) = token {
        ctx.token = t.to_string();
    }
    ctx.client_config(30).validate()?;

    config.save(config_path)?;
    println!("Context \"{name}\" updated.");
    Ok(())
}

pub fn delete(name: &str, config_path: &Path) -> Result<()> {
    let mut config = CliConfig::load(config_path)?;

    if !config.remove_context(name) {
        anyhow::bail!("Context \"{name}\" not found.");
    }

    config.save(config_path)?;
    println!("Context \"{name}\" deleted.");
    Ok(())
}
