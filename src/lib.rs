//! Relational persistence of assignments and schedulers.
//!
//! The stores live in [`dispatch_store_infra`] and operate on the plain
//! structs of [`dispatch_store_domain`]. Both are re-exported here.

pub mod telemetry;

pub use dispatch_store_domain as domain;
pub use dispatch_store_infra as infra;

pub use dispatch_store_domain::*;
pub use dispatch_store_infra::{
    run_migration, setup_context, Config, IAssignmentStore, ISchedulerStore, RequestScope,
    StoreContext, StoreError, StoreResult, Stores,
};
