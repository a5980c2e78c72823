//! Domain services for the stockroom upload lifecycle: ownership
//! verification and the orphaned-upload reconciler.

pub mod ownership;
pub mod reconciler;

pub use ownership::OwnershipVerifier;
pub use reconciler::{OrphanReconciler, SweepFailure, SweepSummary};
