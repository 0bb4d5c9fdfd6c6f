//! Collection merge engine for array-backed kinds.
//!
//! Health checks and log collectors live in one array per cluster that the
//! server only accepts back whole. These functions are the pure middle of the
//! fetch, merge, replace-all cycle; they do no I/O.
//!
//! Two reconciliations against the same cluster's array can race: if both
//! fetch before either writes, the second write drops the first one's change.
//! The remote API offers no lock or version check, so nothing here prevents
//! it.

use crate::identity::{Identified, MatchKey};

/// Reasons a merge is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Insert would create a second element with the same name.
    #[error("an element named '{0}' already exists in the collection")]
    Duplicate(String),
    /// Replace found nothing to replace.
    #[error("no element named '{0}' in the collection")]
    NoMatch(String),
}

/// Append `element`, rejecting a duplicate name.
pub fn merge_insert<T: Identified>(mut collection: Vec<T>, element: T) -> Result<Vec<T>, MergeError> {
    if collection
        .iter()
        .any(|existing| MatchKey::Name(element.name_key()).matches(existing))
    {
        return Err(MergeError::Duplicate(element.name_key().to_string()));
    }
    collection.push(element);
    Ok(collection)
}

/// Replace the first element matching `key` in place, keeping its position.
pub fn merge_replace<T: Identified>(
    mut collection: Vec<T>,
    key: MatchKey<'_>,
    element: T,
) -> Result<Vec<T>, MergeError> {
    let Some(position) = collection.iter().position(|existing| key.matches(existing)) else {
        let wanted = match key {
            MatchKey::Id(id) | MatchKey::Name(id) => id.to_string(),
        };
        return Err(MergeError::NoMatch(wanted));
    };

    // A rename must not collide with another element's name.
    let renamed_onto = collection.iter().enumerate().any(|(index, existing)| {
        index != position && existing.name_key() == element.name_key()
    });
    if renamed_onto {
        return Err(MergeError::Duplicate(element.name_key().to_string()));
    }

    collection[position] = element;
    Ok(collection)
}

/// Remove every element matching `key`. Removing nothing is not an error.
pub fn merge_delete<T: Identified>(mut collection: Vec<T>, key: MatchKey<'_>) -> Vec<T> {
    collection.retain(|existing| !key.matches(existing));
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::{CallContext, ClusterRef, Gateway, MockGateway, TcpCheck};
    use std::collections::HashSet;

    fn check(id: &str, name: &str) -> TcpCheck {
        TcpCheck {
            id: id.to_string(),
            name: name.to_string(),
            tcp: "localhost:9092".to_string(),
            ..TcpCheck::default()
        }
    }

    fn names(collection: &[TcpCheck]) -> HashSet<String> {
        collection.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_insert_then_delete_restores_original() {
        let original = vec![check("1", "disk"), check("2", "mem")];
        let inserted = merge_insert(original.clone(), check("3", "cpu")).unwrap();
        assert_eq!(inserted.len(), 3);

        let restored = merge_delete(inserted, MatchKey::Name("cpu"));
        assert_eq!(names(&restored), names(&original));
        assert_eq!(restored, original);
    }

    #[test]
    fn test_insert_rejects_duplicate_name() {
        let collection = vec![check("1", "disk")];
        let err = merge_insert(collection, check("2", "disk")).unwrap_err();
        assert_eq!(err, MergeError::Duplicate("disk".to_string()));
    }

    #[test]
    fn test_sequential_inserts_keep_both() {
        let collection = merge_insert(Vec::new(), check("1", "disk")).unwrap();
        let collection = merge_insert(collection, check("2", "mem")).unwrap();
        assert_eq!(names(&collection), HashSet::from(["disk".to_string(), "mem".to_string()]));
    }

    #[test]
    fn test_stale_snapshot_loses_first_insert() {
        let mock = MockGateway::new();
        let ctx = CallContext::background();
        let cluster = ClusterRef::kafka("prod");

        // Both writers fetch before either replaces.
        let mut first = mock.get_healthchecks(&ctx, &cluster).unwrap();
        let mut second = mock.get_healthchecks(&ctx, &cluster).unwrap();

        first.tcpchecks = merge_insert(first.tcpchecks, check("1", "disk")).unwrap();
        mock.replace_healthchecks(&ctx, &cluster, &first).unwrap();
        assert_eq!(mock.healthchecks(&cluster).tcpchecks.len(), 1);

        second.tcpchecks = merge_insert(second.tcpchecks, check("2", "mem")).unwrap();
        mock.replace_healthchecks(&ctx, &cluster, &second).unwrap();

        let server = mock.healthchecks(&cluster).tcpchecks;
        assert_eq!(names(&server), HashSet::from(["mem".to_string()]));
    }

    #[test]
    fn test_replace_keeps_position() {
        let collection = vec![check("1", "disk"), check("2", "mem"), check("3", "cpu")];
        let mut replacement = check("2", "mem");
        replacement.tcp = "localhost:9999".to_string();

        let merged = merge_replace(collection, MatchKey::Name("mem"), replacement).unwrap();
        assert_eq!(merged[1].tcp, "localhost:9999");
        assert_eq!(merged[0].name, "disk");
        assert_eq!(merged[2].name, "cpu");
    }

    #[test]
    fn test_replace_with_rename() {
        let collection = vec![check("1", "disk")];
        let merged = merge_replace(collection, MatchKey::Name("disk"), check("1", "disk-root")).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "disk-root");
    }

    #[test]
    fn test_replace_rename_collision() {
        let collection = vec![check("1", "disk"), check("2", "mem")];
        let err = merge_replace(collection, MatchKey::Name("disk"), check("1", "mem")).unwrap_err();
        assert_eq!(err, MergeError::Duplicate("mem".to_string()));
    }

    #[test]
    fn test_replace_missing() {
        let err = merge_replace(Vec::new(), MatchKey::Name("disk"), check("1", "disk")).unwrap_err();
        assert_eq!(err, MergeError::NoMatch("disk".to_string()));
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let collection = vec![check("1", "disk")];
        let merged = merge_delete(collection.clone(), MatchKey::Name("mem"));
        assert_eq!(merged, collection);
    }
}
