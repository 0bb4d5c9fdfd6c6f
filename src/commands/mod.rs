pub mod config;
pub mod lifecycle;
pub mod refresh;
pub mod remote;

use anyhow::{Context as _, Result};
use gateway::{CallContext, ClusterRef, HttpGateway};
use reconcile::{DynReconciler, Registry};
use serde_json::Value;
use std::fs;
use std::io::{self, Read as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::Context;
use crate::config::FileConfig;
use crate::paths;
use crate::state::ClusterformState;

/// Config file named on the command line, or the default location
pub fn config_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.connection.config {
        Some(path) => Ok(path.clone()),
        None => paths::config_file(),
    }
}

/// State file named on the command line, or the default location
pub fn state_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.connection.state {
        Some(path) => Ok(path.clone()),
        None => paths::state_file(),
    }
}

/// File config with flag and environment overrides applied
pub fn load_config(ctx: &Context) -> Result<FileConfig> {
    Ok(FileConfig::load(&config_path(ctx)?)?.with_overrides(&ctx.connection))
}

/// Everything a command needs to talk to the server and track records
pub struct Session {
    pub registry: Registry,
    pub state: ClusterformState,
    pub state_path: PathBuf,
    pub call: CallContext,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let config = load_config(ctx)?.resolve()?;
        log::debug!("Using management API at {}", config.base_url());
        let gateway = HttpGateway::new(config)?;

        let state_path = state_path(ctx)?;
        let state = ClusterformState::load(&state_path)?;

        Ok(Self {
            registry: Registry::new(Arc::new(gateway)),
            state,
            state_path,
            call: call_context(ctx),
        })
    }

    pub fn save(&mut self) -> Result<()> {
        self.state.touch(&self.state_path)
    }
}

pub fn call_context(ctx: &Context) -> CallContext {
    match ctx.deadline {
        Some(secs) => CallContext::with_timeout(Duration::from_secs(secs)),
        None => CallContext::background(),
    }
}

/// Cluster from flags, falling back to the kind's default cluster type
pub fn cluster_for(reconciler: &dyn DynReconciler, name: &str, cluster_type: Option<&str>) -> ClusterRef {
    ClusterRef::new(
        cluster_type.unwrap_or(reconciler.default_cluster_type()),
        name,
    )
}

/// Read a spec document: TOML for `.toml` files, JSON otherwise, `-` for stdin
pub fn read_spec(path: &Path) -> Result<Value> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read spec from stdin")?;
        return serde_json::from_str(&content).context("Invalid JSON spec on stdin");
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).with_context(|| format!("Invalid TOML spec {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON spec {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_toml_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.toml");
        fs::write(
            &path,
            "name = \"orders\"\npartitions = 6\nreplication_factor = 3\n\n[config]\ncleanup_policy = \"compact\"\n",
        )
        .unwrap();

        let spec = read_spec(&path).unwrap();
        assert_eq!(
            spec,
            json!({
                "name": "orders",
                "partitions": 6,
                "replication_factor": 3,
                "config": { "cleanup_policy": "compact" }
            })
        );
    }

    #[test]
    fn test_read_json_spec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        fs::write(&path, r#"{"name": "orders"}"#).unwrap();
        assert_eq!(read_spec(&path).unwrap(), json!({ "name": "orders" }));

        fs::write(&path, "name = 1").unwrap();
        assert!(read_spec(&path).is_err());
    }
}
