//! Read-only queries against the server; nothing is tracked.

use anyhow::{Context as _, Result};
use gateway::{GatewayConfig, HttpGateway};
use reconcile::{Kind, Registry};
use std::sync::Arc;

use super::{call_context, cluster_for, load_config};
use crate::Context;
use crate::cli::{DiscoverArgs, LookupArgs};
use crate::ui;

fn registry(ctx: &Context) -> Result<Registry> {
    let config: GatewayConfig = load_config(ctx)?.resolve()?;
    Ok(Registry::new(Arc::new(HttpGateway::new(config)?)))
}

fn parse_kind(kind: &str) -> Result<Kind> {
    kind.parse::<Kind>().map_err(anyhow::Error::msg)
}

pub fn lookup(ctx: &Context, args: &LookupArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let registry = registry(ctx)?;
    let reconciler = registry.get(kind)?;

    match reconciler
        .lookup(&call_context(ctx), &args.id)
        .with_context(|| format!("Failed to look up {kind} {}", args.id))?
    {
        Some(record) => ui::record(&format!("{kind} {}", args.id), &record),
        None => ui::warn(&format!("No {kind} matches {}", args.id)),
    }
    Ok(())
}

pub fn discover(ctx: &Context, args: DiscoverArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let registry = registry(ctx)?;
    let reconciler = registry.get(kind)?;
    let cluster = cluster_for(reconciler, &args.cluster, args.cluster_type.as_deref());

    let ids = reconciler
        .discover(&call_context(ctx), &cluster)
        .with_context(|| format!("Failed to discover {kind} on {cluster}"))?;

    if ids.is_empty() {
        if !ctx.quiet {
            ui::info(&format!("No {kind} found on {cluster}"));
        }
        return Ok(());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
