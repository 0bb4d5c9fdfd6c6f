use anyhow::{Result, bail};
use reconcile::{ErasedRecord, LifecycleState, ReadOutcome};

use super::Session;
use crate::Context;
use crate::cli::RefreshArgs;
use crate::state::Address;
use crate::ui;

/// Read every tracked record in parallel, then apply the outcomes in order.
pub fn run(ctx: &Context, args: &RefreshArgs) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let (addresses, records): (Vec<Address>, Vec<ErasedRecord>) = session
        .state
        .entries()
        .into_iter()
        .map(|(address, record)| (address, record.clone()))
        .unzip();

    if records.is_empty() {
        ui::info("No tracked records to refresh");
        return Ok(());
    }

    let jobs = usize::from(args.jobs.max(1));
    log::info!("Refreshing {} records with {jobs} jobs", records.len());
    let outcomes = session
        .registry
        .read_many(&session.call, &records, jobs, args.fail_fast)?;

    let mut drifted = 0usize;
    let mut gone = 0usize;
    let mut failed = 0usize;
    for (address, outcome) in addresses.iter().zip(outcomes) {
        match outcome {
            Ok(ReadOutcome::Present(observed)) => {
                if observed.state == LifecycleState::Drifted {
                    drifted += 1;
                    ui::warn(&format!("{address} drifted"));
                } else if ctx.verbose > 0 {
                    ui::dim(&format!("{address} in sync"));
                }
                session.state.put(address, observed);
            }
            Ok(ReadOutcome::Gone) => {
                gone += 1;
                ui::warn(&format!("{address} no longer exists remotely; removed from state"));
                session.state.remove(address);
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("{address}: {e}"));
            }
        }
    }
    session.save()?;

    if !ctx.quiet {
        ui::success(&format!(
            "Refreshed {} records ({drifted} drifted, {gone} gone, {failed} failed)",
            records.len()
        ));
    }
    if failed > 0 {
        bail!("{failed} of {} records could not be read", records.len());
    }
    Ok(())
}
