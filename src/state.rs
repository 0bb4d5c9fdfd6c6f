use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reconcile::{ErasedRecord, Kind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Addresses
// ============================================================================

/// Local name of a managed record: `<kind>.<name>`, e.g. `topic.orders`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub kind: Kind,
    pub name: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((kind, name)) = s.split_once('.') else {
            bail!("invalid address '{s}': expected <kind>.<name>, e.g. topic.orders");
        };
        if name.is_empty() {
            bail!("invalid address '{s}': name is empty");
        }
        let kind = kind.parse::<Kind>().map_err(anyhow::Error::msg)?;
        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

// ============================================================================
// State Structures
// ============================================================================

/// Confirmed records, persisted between invocations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterformState {
    /// Records keyed by address
    #[serde(default)]
    pub records: BTreeMap<String, ErasedRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl Default for ClusterformState {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl ClusterformState {
    /// Load state from `path`, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded {} records from {}", state.records.len(), path.display());
        Ok(state)
    }

    /// Save state to `path`, creating parent directories
    ///
    /// Written to a sibling temp file first, then renamed over the old one.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        let tmp = temp_path(path);
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    // ========================================================================
    // Record Helpers
    // ========================================================================

    pub fn get(&self, address: &Address) -> Option<&ErasedRecord> {
        self.records.get(&address.to_string())
    }

    /// Look up a record, failing with a hint when it is not tracked
    pub fn require(&self, address: &Address) -> Result<&ErasedRecord> {
        self.get(address).with_context(|| {
            format!("{address} is not in the state file (see 'clusterform list')")
        })
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.records.contains_key(&address.to_string())
    }

    pub fn put(&mut self, address: &Address, record: ErasedRecord) {
        self.records.insert(address.to_string(), record);
    }

    pub fn remove(&mut self, address: &Address) -> Option<ErasedRecord> {
        self.records.remove(&address.to_string())
    }

    /// Addresses and records in address order; unparseable keys are skipped
    pub fn entries(&self) -> Vec<(Address, &ErasedRecord)> {
        self.records
            .iter()
            .filter_map(|(key, record)| match key.parse::<Address>() {
                Ok(address) => Some((address, record)),
                Err(e) => {
                    log::warn!("Skipping state entry '{key}': {e}");
                    None
                }
            })
            .collect()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::ClusterRef;
    use reconcile::{Identity, LifecycleState, ManagedResource};
    use serde_json::json;

    fn orders() -> ErasedRecord {
        ManagedResource {
            kind: Kind::Topic,
            cluster: ClusterRef::kafka("prod"),
            identity: Some(Identity::Natural("orders".to_string())),
            spec: json!({ "name": "orders", "partitions": 6, "replication_factor": 3 }),
            computed: serde_json::Value::Null,
            state: LifecycleState::Present,
        }
    }

    #[test]
    fn test_address_parsing() {
        let address: Address = "log-collector.broker.main".parse().unwrap();
        assert_eq!(address.kind, Kind::LogCollector);
        assert_eq!(address.name, "broker.main");
        assert_eq!(address.to_string(), "log-collector.broker.main");

        assert!("topic".parse::<Address>().is_err());
        assert!("topic.".parse::<Address>().is_err());
        assert!("widget.a".parse::<Address>().is_err());
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = ClusterformState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.records.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let address: Address = "topic.orders".parse().unwrap();

        let mut state = ClusterformState::default();
        state.put(&address, orders());
        state.touch(&path).unwrap();
        assert!(!temp_path(&path).exists());

        let loaded = ClusterformState::load(&path).unwrap();
        assert_eq!(loaded.get(&address), Some(&orders()));
        assert_eq!(loaded.entries().len(), 1);
    }

    #[test]
    fn test_remove_and_require() {
        let address: Address = "topic.orders".parse().unwrap();
        let mut state = ClusterformState::default();
        assert!(state.require(&address).is_err());

        state.put(&address, orders());
        assert!(state.contains(&address));
        assert!(state.remove(&address).is_some());
        assert!(!state.contains(&address));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        let err = ClusterformState::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
