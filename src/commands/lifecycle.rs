//! Commands that change or show tracked records.

use anyhow::{Context as _, Result, bail};
use reconcile::ReadOutcome;

use super::{Session, cluster_for, read_spec, state_path};
use crate::Context;
use crate::cli::{CreateArgs, ImportArgs, UpdateArgs};
use crate::state::{Address, ClusterformState};
use crate::ui;

pub fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let address: Address = args.address.parse()?;
    let mut session = Session::open(ctx)?;
    if session.state.contains(&address) {
        bail!("{address} is already tracked; update it or delete it first");
    }

    let reconciler = session.registry.get(address.kind)?;
    let cluster = cluster_for(reconciler, &args.cluster, args.cluster_type.as_deref());
    let planned = reconciler.plan(cluster, read_spec(&args.spec)?)?;
    let created = reconciler
        .create(&session.call, &planned)
        .with_context(|| format!("Failed to create {address}"))?;

    let label = created.label();
    session.state.put(&address, created);
    session.save()?;

    if !ctx.quiet {
        ui::success(&format!("Created {address} ({label})"));
    }
    Ok(())
}

pub fn read(ctx: &Context, address: &str) -> Result<()> {
    let address: Address = address.parse()?;
    let mut session = Session::open(ctx)?;
    let record = session.state.require(&address)?.clone();

    let reconciler = session.registry.get(address.kind)?;
    match reconciler
        .read(&session.call, &record)
        .with_context(|| format!("Failed to read {address}"))?
    {
        ReadOutcome::Present(observed) => {
            if !ctx.quiet {
                ui::record(&address.to_string(), &observed);
            }
            session.state.put(&address, observed);
        }
        ReadOutcome::Gone => {
            ui::warn(&format!("{address} no longer exists remotely; removed from state"));
            session.state.remove(&address);
        }
    }
    session.save()
}

pub fn update(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let address: Address = args.address.parse()?;
    let mut session = Session::open(ctx)?;
    let current = session.state.require(&address)?.clone();
    let desired = read_spec(&args.spec)?;

    let reconciler = session.registry.get(address.kind)?;
    match reconciler.update(&session.call, &current, &desired) {
        Ok(updated) => {
            let label = updated.label();
            session.state.put(&address, updated);
            session.save()?;
            if !ctx.quiet {
                ui::success(&format!("Updated {address} ({label})"));
            }
            Ok(())
        }
        Err(e) if e.is_partial_replace() => {
            // The old object is gone; keeping its record would misreport it.
            session.state.remove(&address);
            session.save()?;
            ui::warn(&format!(
                "{address} was deleted remotely but not recreated; removed from state"
            ));
            Err(e).with_context(|| format!("Failed to update {address}"))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to update {address}")),
    }
}

pub fn delete(ctx: &Context, address: &str) -> Result<()> {
    let address: Address = address.parse()?;
    let mut session = Session::open(ctx)?;
    let record = session.state.require(&address)?.clone();

    session
        .registry
        .get(address.kind)?
        .delete(&session.call, &record)
        .with_context(|| format!("Failed to delete {address}"))?;
    session.state.remove(&address);
    session.save()?;

    if !ctx.quiet {
        ui::success(&format!("Deleted {address}"));
    }
    Ok(())
}

pub fn import(ctx: &Context, args: &ImportArgs) -> Result<()> {
    let address: Address = args.address.parse()?;
    let mut session = Session::open(ctx)?;
    if session.state.contains(&address) {
        bail!("{address} is already tracked");
    }

    let reconciler = session.registry.get(address.kind)?;
    let imported = reconciler
        .import(&session.call, &args.id)
        .with_context(|| {
            format!(
                "Failed to import {address} (import id format: {})",
                reconciler.import_format()
            )
        })?;

    let label = imported.label();
    session.state.put(&address, imported);
    session.save()?;

    if !ctx.quiet {
        ui::success(&format!("Imported {address} ({label})"));
    }
    Ok(())
}

/// `list` and `show` only need the state file, not a server connection
pub fn list(ctx: &Context) -> Result<()> {
    let state = ClusterformState::load(&state_path(ctx)?)?;
    let entries = state.entries();
    if entries.is_empty() {
        ui::info("No tracked records");
        return Ok(());
    }

    ui::header(&format!("Tracked records ({})", entries.len()));
    for (address, record) in entries {
        println!(
            "  {:<40} {:<24} {:<10} {}",
            address.to_string(),
            record.cluster.to_string(),
            ui::state_label(record.state),
            record.label()
        );
        if ctx.verbose > 0 {
            ui::dim(&record.spec.to_string());
        }
    }
    println!();
    ui::dim(&format!("Last updated {}", state.last_updated.to_rfc3339()));
    Ok(())
}

pub fn show(ctx: &Context, address: &str) -> Result<()> {
    let address: Address = address.parse()?;
    let state = ClusterformState::load(&state_path(ctx)?)?;
    ui::record(&address.to_string(), state.require(&address)?);
    Ok(())
}

