//! Peer-set reconciler for the char combat service.
//!
//! One unit of the char workload runs per pod; each unit must know the
//! addresses of all the others (its "enemies") to fight them. This crate
//! is the control-loop body that keeps one unit's running service in
//! sync with that peer set: lifecycle triggers delivered by the host
//! feed [`reconciler::Reconciler::reconcile`], which tracks peers in a
//! [`directory::PeerDirectory`], renders the desired service layer and
//! reconciles it against the runtime through the
//! [`runtime::WorkloadController`] seam.
//!
//! The host event loop, the real runtime API and the relation transport
//! are external; they plug in via the [`runtime::WorkloadController`]
//! and [`relation::RelationStore`] traits.

pub mod actions;
pub mod config;
pub mod directory;
pub mod error;
pub mod layer;
pub mod reconciler;
pub mod relation;
pub mod runtime;
pub mod sees;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use reconciler::Reconciler;
pub use types::{Event, ReconcileOutcome, UnitId, UnitStatus};
