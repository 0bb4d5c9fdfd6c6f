//! # reconcile
//!
//! Declarative lifecycle for resources managed through the cluster
//! management API.
//!
//! A [`Reconciler`] drives create, read, update, delete and import for one
//! kind, with the kind-specific parts behind [`KindDescriptor`]. Kinds whose
//! server side is a single shared array (health checks, log collectors) go
//! through the read-modify-write helpers in [`merge`].
//!
//! ## Example
//!
//! ```no_run
//! use gateway::{CallContext, ClusterRef, MockGateway};
//! use reconcile::kinds::{TopicKind, TopicSpec};
//! use reconcile::Reconciler;
//! use std::sync::Arc;
//!
//! let reconciler = Reconciler::new(Arc::new(MockGateway::new()), TopicKind);
//! let spec = TopicSpec {
//!     name: "orders".into(),
//!     partitions: 6,
//!     replication_factor: 3,
//!     config: Default::default(),
//! };
//! let ctx = CallContext::background();
//! let created = reconciler.create(&ctx, &reconciler.plan(ClusterRef::kafka("prod"), spec))?;
//! println!("{} is {}", created.label(), created.state);
//! # Ok::<(), reconcile::Error>(())
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod identity;
pub mod import;
pub mod kinds;
pub mod merge;
pub mod reconciler;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use identity::{Identified, MatchKey, locate};
pub use import::ImportFormat;
pub use merge::{MergeError, merge_delete, merge_insert, merge_replace};
pub use reconciler::{Applied, KindDescriptor, Observed, Reconciler, UpdateStrategy};
pub use registry::{DynReconciler, ErasedRecord, Registry};
pub use types::{Identity, Kind, LifecycleState, ManagedResource, ReadOutcome, Verb};
