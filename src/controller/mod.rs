//! RedisFleet controller
//!
//! The reconciler lives in [`fleet`]; [`router`] maps child pod deletions
//! back onto fleets, and [`trigger`] is the key both sides agree on.

mod fleet;
mod router;
mod trigger;

pub use fleet::{error_policy, reconcile, Context, ReconcileOutcome, Reconciler};
pub use router::{deleted_child_triggers, triggers_for_deleted_child};
pub use trigger::ReconcileTrigger;
