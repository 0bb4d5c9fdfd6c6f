use colored::Colorize;
use reconcile::{ErasedRecord, LifecycleState};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Lifecycle state, colored by health
pub fn state_label(state: LifecycleState) -> String {
    let label = state.to_string();
    match state {
        LifecycleState::Present => label.green().to_string(),
        LifecycleState::Drifted => label.yellow().to_string(),
        LifecycleState::Planned => label.cyan().to_string(),
        LifecycleState::Absent => label.red().to_string(),
    }
}

/// Print a record as pretty JSON under a short summary
pub fn record(address: &str, record: &ErasedRecord) {
    println!(
        "{} {} on {} ({})",
        address.bold(),
        record.label(),
        record.cluster,
        state_label(record.state)
    );
    match serde_json::to_string_pretty(&record.spec) {
        Ok(json) => println!("{json}"),
        Err(e) => error(&format!("cannot render spec: {e}")),
    }
    if !record.computed.is_null() {
        match serde_json::to_string_pretty(&record.computed) {
            Ok(json) => {
                println!("{}", "computed:".dimmed());
                println!("{json}");
            }
            Err(e) => error(&format!("cannot render computed values: {e}")),
        }
    }
}
