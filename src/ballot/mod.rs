pub mod entries;
pub mod lifecycle;
pub mod reconcile;

pub use entries::BallotEntryList;
pub use lifecycle::{BallotLifecycle, RescindConfirmation, SubmissionPolicy};
pub use reconcile::{DraftReconciler, DraftSource, Reconciliation, RestorationNotice};
