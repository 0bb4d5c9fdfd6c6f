//! Generic lifecycle state machine.
//!
//! One [`Reconciler`] drives create, read, update, delete and import for any
//! kind. Everything kind-specific sits behind [`KindDescriptor`]: how a spec
//! becomes a payload, how the remote object is found again, which fields are
//! immutable and whether update happens in place or by delete-then-create.

use crate::error::{Error, Result};
use crate::import::ImportFormat;
use crate::types::{Identity, Kind, LifecycleState, ManagedResource, ReadOutcome, Verb};
use gateway::{CallContext, ClusterRef, Gateway};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// How a kind applies a changed spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// The remote API has an update endpoint.
    InPlace,
    /// Delete the old object, then create the new one. Not atomic.
    Recreate,
}

/// A remote object as found by [`KindDescriptor::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<S, C> {
    pub spec: S,
    pub computed: C,
    /// Identity carried by the remote object, if it has one.
    pub identity: Option<Identity>,
}

/// Result of a successful create or in-place update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied<C> {
    pub computed: C,
    /// Replaces the record's identity when set.
    pub identity: Option<Identity>,
}

impl<C> Applied<C> {
    pub fn new(computed: C) -> Self {
        Self {
            computed,
            identity: None,
        }
    }
}

/// Per-kind behavior plugged into the generic [`Reconciler`].
pub trait KindDescriptor: Send + Sync {
    /// Desired fields, as written by the user and sent on writes.
    type Spec: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;
    /// Fields only the remote system populates.
    type Computed: Clone
        + PartialEq
        + Default
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;
    /// Whatever [`fetch`](Self::fetch) and [`delete`](Self::delete) need to
    /// find the remote object.
    type Key: fmt::Debug + Send;

    const KIND: Kind;
    const IMPORT: ImportFormat;
    const UPDATE: UpdateStrategy = UpdateStrategy::InPlace;
    /// Cluster type assumed when a create names only a cluster.
    const DEFAULT_CLUSTER_TYPE: &'static str = "kafka";
    /// Whether read adopts the identity the server reports. Only for kinds
    /// whose server regenerates ids.
    const ADOPT_REMOTE_IDENTITY: bool = false;

    /// Identity for a new remote object; generated before the create call.
    fn new_identity(&self, cluster: &ClusterRef, spec: &Self::Spec) -> Identity;

    /// Lookup key for an existing record.
    fn key(&self, spec: &Self::Spec, identity: &Identity) -> Self::Key;

    /// Reject specs that cannot describe a valid remote object.
    fn validate(&self, _spec: &Self::Spec) -> Result<()> {
        Ok(())
    }

    /// Reject changes to fields the remote system cannot alter.
    fn check_immutable(&self, _current: &Self::Spec, _desired: &Self::Spec) -> Result<()> {
        Ok(())
    }

    fn create(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        spec: &Self::Spec,
        identity: &Identity,
    ) -> Result<Applied<Self::Computed>>;

    /// `Ok(None)` when the object does not exist remotely.
    fn fetch(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &Self::Key,
    ) -> Result<Option<Observed<Self::Spec, Self::Computed>>>;

    /// Fold the observed spec into the stored one. The remote side wins,
    /// except where it only reformats a value the user wrote.
    fn reconcile_observed(&self, _stored: &Self::Spec, observed: Self::Spec) -> Self::Spec {
        observed
    }

    /// In-place update. Only called for [`UpdateStrategy::InPlace`] kinds.
    fn update(
        &self,
        _gateway: &dyn Gateway,
        _ctx: &CallContext,
        _cluster: &ClusterRef,
        _identity: &Identity,
        _current: &Self::Spec,
        _desired: &Self::Spec,
    ) -> Result<Applied<Self::Computed>> {
        Err(Error::config(format!(
            "{} has no in-place update",
            Self::KIND
        )))
    }

    /// Remove the remote object. A not-found error is treated as success by
    /// the caller.
    fn delete(
        &self,
        gateway: &dyn Gateway,
        ctx: &CallContext,
        cluster: &ClusterRef,
        key: &Self::Key,
    ) -> Result<()>;

    /// Map import id segments, already counted and non-empty, to a key.
    fn parse_key(&self, segments: &[&str]) -> Result<(ClusterRef, Self::Key)>;

    /// Import ids of every object of this kind on a cluster, or `None` when
    /// the kind cannot be enumerated.
    fn discover(
        &self,
        _gateway: &dyn Gateway,
        _ctx: &CallContext,
        _cluster: &ClusterRef,
    ) -> Result<Option<Vec<String>>> {
        Ok(None)
    }
}

type Record<K> = ManagedResource<<K as KindDescriptor>::Spec, <K as KindDescriptor>::Computed>;

/// Lifecycle driver for one kind.
///
/// Holds a shared handle to the gateway; safe to use from several threads
/// for different records at once.
pub struct Reconciler<K: KindDescriptor> {
    gateway: Arc<dyn Gateway>,
    kind: K,
}

impl<K: KindDescriptor> Reconciler<K> {
    pub fn new(gateway: Arc<dyn Gateway>, kind: K) -> Self {
        Self { gateway, kind }
    }

    pub fn descriptor(&self) -> &K {
        &self.kind
    }

    /// A desired-state record ready for [`create`](Self::create).
    pub fn plan(&self, cluster: ClusterRef, spec: K::Spec) -> Record<K> {
        ManagedResource::planned(K::KIND, cluster, spec)
    }

    /// Create the remote object for a planned record.
    ///
    /// On failure nothing is returned and the planned record is untouched.
    pub fn create(&self, ctx: &CallContext, record: &Record<K>) -> Result<Record<K>> {
        check_state::<K>(Verb::Create, record, |state| state == LifecycleState::Planned)?;

        let identity = self.kind.new_identity(&record.cluster, &record.spec);
        let wrap = |e: Error| e.in_operation(Verb::Create, K::KIND, &record.cluster, identity.value());

        self.kind.validate(&record.spec).map_err(wrap)?;
        let applied = self
            .kind
            .create(self.gateway.as_ref(), ctx, &record.cluster, &record.spec, &identity)
            .map_err(wrap)?;

        log::info!("created {} {} on {}", K::KIND, identity, record.cluster);
        Ok(ManagedResource {
            kind: K::KIND,
            cluster: record.cluster.clone(),
            identity: Some(applied.identity.unwrap_or(identity)),
            spec: record.spec.clone(),
            computed: applied.computed,
            state: LifecycleState::Present,
        })
    }

    /// Refresh a live record from the remote system.
    ///
    /// A missing remote object is [`ReadOutcome::Gone`], not an error.
    pub fn read(&self, ctx: &CallContext, record: &Record<K>) -> Result<ReadOutcome<K::Spec, K::Computed>> {
        check_state::<K>(Verb::Read, record, |state| state.is_live())?;
        let identity = identity_of::<K>(Verb::Read, record)?;

        let key = self.kind.key(&record.spec, identity);
        let observed = self
            .kind
            .fetch(self.gateway.as_ref(), ctx, &record.cluster, &key)
            .map_err(|e| e.in_operation(Verb::Read, K::KIND, &record.cluster, identity.value()))?;

        let Some(observed) = observed else {
            log::info!(
                "{} {} no longer exists on {}; dropping it",
                K::KIND,
                identity,
                record.cluster
            );
            return Ok(ReadOutcome::Gone);
        };

        let spec = self.kind.reconcile_observed(&record.spec, observed.spec);
        let state = if spec == record.spec {
            LifecycleState::Present
        } else {
            log::info!("{} {} on {} drifted", K::KIND, identity, record.cluster);
            LifecycleState::Drifted
        };
        let identity = match observed.identity {
            Some(remote) if K::ADOPT_REMOTE_IDENTITY => remote,
            _ => identity.clone(),
        };

        Ok(ReadOutcome::Present(ManagedResource {
            kind: K::KIND,
            cluster: record.cluster.clone(),
            identity: Some(identity),
            spec,
            computed: observed.computed,
            state,
        }))
    }

    /// Apply `desired` to a live record.
    ///
    /// Immutable-field changes are rejected before any remote call. For
    /// delete-then-create kinds a failed create after a successful delete is
    /// [`Error::PartialReplace`]: the old object no longer exists remotely.
    pub fn update(&self, ctx: &CallContext, current: &Record<K>, desired: &K::Spec) -> Result<Record<K>> {
        check_state::<K>(Verb::Update, current, |state| state.is_live())?;
        let identity = identity_of::<K>(Verb::Update, current)?;
        let cluster = &current.cluster;
        let wrap = |e: Error| e.in_operation(Verb::Update, K::KIND, cluster, identity.value());

        self.kind.validate(desired).map_err(wrap)?;
        self.kind.check_immutable(&current.spec, desired).map_err(wrap)?;

        let (identity, computed) = match K::UPDATE {
            UpdateStrategy::InPlace => {
                let applied = self
                    .kind
                    .update(self.gateway.as_ref(), ctx, cluster, identity, &current.spec, desired)
                    .map_err(wrap)?;
                (applied.identity.unwrap_or_else(|| identity.clone()), applied.computed)
            }
            UpdateStrategy::Recreate => self.recreate(ctx, current, identity, desired)?,
        };

        log::info!("updated {} {} on {}", K::KIND, identity, cluster);
        Ok(ManagedResource {
            kind: K::KIND,
            cluster: cluster.clone(),
            identity: Some(identity),
            spec: desired.clone(),
            computed,
            state: LifecycleState::Present,
        })
    }

    fn recreate(
        &self,
        ctx: &CallContext,
        current: &Record<K>,
        identity: &Identity,
        desired: &K::Spec,
    ) -> Result<(Identity, K::Computed)> {
        let cluster = &current.cluster;
        let old_key = self.kind.key(&current.spec, identity);
        match self.kind.delete(self.gateway.as_ref(), ctx, cluster, &old_key) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                log::debug!("{} {} already absent on {}", K::KIND, identity, cluster);
            }
            Err(e) => return Err(e.in_operation(Verb::Update, K::KIND, cluster, identity.value())),
        }

        let replacement = self.kind.new_identity(cluster, desired);
        match self
            .kind
            .create(self.gateway.as_ref(), ctx, cluster, desired, &replacement)
        {
            Ok(applied) => Ok((applied.identity.unwrap_or(replacement), applied.computed)),
            Err(e) => {
                log::warn!(
                    "{} {} was deleted on {} but its replacement could not be created",
                    K::KIND,
                    identity,
                    cluster
                );
                Err(Error::PartialReplace {
                    kind: K::KIND,
                    cluster: cluster.clone(),
                    identity: identity.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Delete the remote object. Already absent counts as success.
    pub fn delete(&self, ctx: &CallContext, record: &Record<K>) -> Result<()> {
        check_state::<K>(Verb::Delete, record, |state| state.is_live())?;
        let identity = identity_of::<K>(Verb::Delete, record)?;

        let key = self.kind.key(&record.spec, identity);
        match self.kind.delete(self.gateway.as_ref(), ctx, &record.cluster, &key) {
            Ok(()) => {
                log::info!("deleted {} {} on {}", K::KIND, identity, record.cluster);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                log::info!("{} {} already absent on {}", K::KIND, identity, record.cluster);
                Ok(())
            }
            Err(e) => Err(e.in_operation(Verb::Delete, K::KIND, &record.cluster, identity.value())),
        }
    }

    /// Find an existing remote object by import id without adopting it.
    pub fn lookup(&self, ctx: &CallContext, raw: &str) -> Result<Option<Record<K>>> {
        self.find(Verb::Lookup, ctx, raw).map(|(_, record)| record)
    }

    /// Adopt an existing remote object by import id. Import never creates.
    pub fn import(&self, ctx: &CallContext, raw: &str) -> Result<Record<K>> {
        let (cluster, record) = self.find(Verb::Import, ctx, raw)?;
        let record = record.ok_or_else(|| Error::NotFound {
            kind: K::KIND,
            cluster,
            key: raw.to_string(),
        })?;
        log::info!("imported {} {} on {}", K::KIND, record.label(), record.cluster);
        Ok(record)
    }

    fn find(&self, verb: Verb, ctx: &CallContext, raw: &str) -> Result<(ClusterRef, Option<Record<K>>)> {
        let segments = K::IMPORT.parse(K::KIND, raw)?;
        let (cluster, key) = self.kind.parse_key(&segments)?;

        let observed = self
            .kind
            .fetch(self.gateway.as_ref(), ctx, &cluster, &key)
            .map_err(|e| e.in_operation(verb, K::KIND, &cluster, raw))?;

        let record = observed.map(|observed| {
            let identity = observed
                .identity
                .unwrap_or_else(|| self.kind.new_identity(&cluster, &observed.spec));
            ManagedResource {
                kind: K::KIND,
                cluster: cluster.clone(),
                identity: Some(identity),
                spec: observed.spec,
                computed: observed.computed,
                state: LifecycleState::Present,
            }
        });
        Ok((cluster, record))
    }

    /// Import ids of every object of this kind on `cluster`.
    pub fn discover(&self, ctx: &CallContext, cluster: &ClusterRef) -> Result<Vec<String>> {
        self.kind
            .discover(self.gateway.as_ref(), ctx, cluster)
            .map_err(|e| e.in_operation(Verb::Discover, K::KIND, cluster, "*"))?
            .ok_or_else(|| Error::config(format!("{} cannot be discovered", K::KIND)))
    }
}

fn check_state<K: KindDescriptor>(
    verb: Verb,
    record: &Record<K>,
    allowed: impl Fn(LifecycleState) -> bool,
) -> Result<()> {
    if record.kind != K::KIND {
        return Err(Error::config(format!(
            "{} record passed to the {} reconciler",
            record.kind,
            K::KIND
        )));
    }
    if !allowed(record.state) {
        return Err(Error::InvalidState {
            verb,
            kind: K::KIND,
            state: record.state,
        });
    }
    Ok(())
}

fn identity_of<K: KindDescriptor>(verb: Verb, record: &Record<K>) -> Result<&Identity> {
    record.identity.as_ref().ok_or_else(|| {
        Error::config(format!(
            "cannot {verb} {} on {}: record has no identity",
            K::KIND,
            record.cluster
        ))
    })
}
