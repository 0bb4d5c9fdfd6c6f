//! Locating one remote object inside a fetched collection.
//!
//! The remote API rarely offers a get-by-key endpoint, so every read fetches a
//! collection and scans it. Matching is either by an immutable id or by a
//! mutable name. Name matching is ambiguous when two objects share a name:
//! the first match in collection order wins and a warning is logged.

use gateway::{AlertRule, Backup, ConnectorInfo, HttpCheck, LogCollector, ShellCheck, TcpCheck, TopicInfo};

/// Elements that carry a name and, optionally, an id.
pub trait Identified {
    /// Human-assigned name; unique within its collection by convention only.
    fn name_key(&self) -> &str;

    /// Server- or client-assigned id; empty when the element has none.
    fn id_key(&self) -> &str {
        ""
    }
}

/// Matching strategy for [`locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey<'a> {
    /// Immutable id; safe under concurrent renames.
    Id(&'a str),
    /// Mutable name; used when no stable id is known.
    Name(&'a str),
}

impl MatchKey<'_> {
    pub fn matches<T: Identified>(&self, element: &T) -> bool {
        match self {
            Self::Id(id) => !id.is_empty() && element.id_key() == *id,
            Self::Name(name) => element.name_key() == *name,
        }
    }
}

/// Find the element matching `key`. Absence is a valid answer, not an error.
pub fn locate<'c, T: Identified>(collection: &'c [T], key: MatchKey<'_>) -> Option<&'c T> {
    let description = match key {
        MatchKey::Id(id) => format!("id '{id}'"),
        MatchKey::Name(name) => format!("name '{name}'"),
    };
    locate_by(collection, &description, |element| key.matches(element))
}

/// Find the first element satisfying `predicate`.
///
/// `description` names the key in the ambiguity warning.
pub fn locate_by<'c, T>(
    collection: &'c [T],
    description: &str,
    predicate: impl Fn(&T) -> bool,
) -> Option<&'c T> {
    let mut matches = collection.iter().filter(|element| predicate(element));
    let first = matches.next()?;
    let others = matches.count();
    if others > 0 {
        log::warn!(
            "{} elements match {description}; using the first in collection order",
            others + 1
        );
    }
    Some(first)
}

impl Identified for TopicInfo {
    fn name_key(&self) -> &str {
        &self.name
    }
}

impl Identified for ConnectorInfo {
    fn name_key(&self) -> &str {
        &self.name
    }
}

impl Identified for ShellCheck {
    fn name_key(&self) -> &str {
        &self.name
    }

    fn id_key(&self) -> &str {
        &self.id
    }
}

impl Identified for HttpCheck {
    fn name_key(&self) -> &str {
        &self.name
    }

    fn id_key(&self) -> &str {
        &self.id
    }
}

impl Identified for TcpCheck {
    fn name_key(&self) -> &str {
        &self.name
    }

    fn id_key(&self) -> &str {
        &self.id
    }
}

impl Identified for LogCollector {
    fn name_key(&self) -> &str {
        &self.name
    }

    fn id_key(&self) -> &str {
        &self.uuid
    }
}

impl Identified for Backup {
    fn name_key(&self) -> &str {
        &self.tag
    }

    fn id_key(&self) -> &str {
        &self.id
    }
}

impl Identified for AlertRule {
    fn name_key(&self) -> &str {
        &self.alert
    }

    fn id_key(&self) -> &str {
        &self.id
    }
}
