mod errors;
mod reconcile;

pub use errors::{ReconcileError, ValidationError, ValidationField, ValidationKind};
pub use reconcile::{ReconcileOutcome, ReconcileState, Reconciler};
