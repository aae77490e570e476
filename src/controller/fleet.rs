//! RedisFleet controller implementation
//!
//! Each pass reads the fleet fresh from the store, compares the desired
//! replica count with the pods recorded in its ownership tracker, and issues
//! the creates or deletes needed to close the gap. Every pass is safe to run
//! again from scratch: creates are skipped for pods that already exist and
//! deletes treat a missing pod as done.
//!
//! Lifecycle:
//! - fleet created or scaled up -> create `<name>-1..=<name>-<replicas>`
//! - replicas lowered -> delete tracked pods outside `1..=replicas`, highest
//!   position first
//! - fleet marked for deletion -> delete every tracked pod, then release the
//!   fleet by emptying the tracker
//!
//! The reconciler never retries on its own. Errors go back to the controller,
//! whose [`error_policy`] requeues the fleet with per-key exponential backoff.

use std::sync::Arc;
use std::time::Instant;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ControllerConfig;
use crate::crd::RedisFleet;
use crate::events::{actions, reasons, EventPublisher, KubeEventPublisher, CONTROLLER_NAME};
use crate::metrics;
use crate::retry::FailureBackoff;
use crate::store::{KubeStore, ResourceStore};
use crate::tracker::{child_name, OwnershipTracker};
use crate::workload::{build_child_pod, is_owned_by};
use crate::Error;

use super::trigger::ReconcileTrigger;

/// What a reconcile pass did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The fleet no longer exists
    Missing,
    /// The fleet is being deleted; `deleted` pods were removed
    TornDown {
        /// Pods actually deleted (already-missing pods are not counted)
        deleted: usize,
    },
    /// Replicas were lowered; `removed` pods were dropped from the tracker
    ScaledDown {
        /// Tracker entries released
        removed: usize,
    },
    /// Every desired pod exists; `created` of them were created by this pass
    Converged {
        /// Pods created by this pass
        created: usize,
    },
}

/// Drives a single fleet towards its declared replica count
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    events: Arc<dyn EventPublisher>,
    child_image: String,
}

impl Reconciler {
    /// Create a reconciler over the given store and event sink
    pub fn new(
        store: Arc<dyn ResourceStore>,
        events: Arc<dyn EventPublisher>,
        child_image: impl Into<String>,
    ) -> Self {
        Self {
            store,
            events,
            child_image: child_image.into(),
        }
    }

    /// Reconcile the fleet named by `trigger`
    ///
    /// A fleet that no longer exists is not an error. A fleet with a deletion
    /// timestamp is torn down without looking at its spec.
    #[instrument(skip(self), fields(fleet = %trigger))]
    pub async fn reconcile(&self, trigger: &ReconcileTrigger) -> Result<ReconcileOutcome, Error> {
        let fleet = match self.store.get_fleet(&trigger.namespace, &trigger.name).await {
            Ok(Some(fleet)) => fleet,
            Ok(None) | Err(Error::NotFound { .. }) => {
                debug!("RedisFleet no longer exists, nothing to reconcile");
                return Ok(ReconcileOutcome::Missing);
            }
            Err(e) => return Err(e),
        };

        if fleet.is_deleting() {
            return self.teardown(fleet, &trigger.namespace).await;
        }

        fleet.spec.validate(&trigger.name)?;

        let want = fleet.spec.desired_count();
        let tracker = OwnershipTracker::from_fleet(&fleet);
        debug!(want, have = tracker.len(), "comparing desired and tracked pods");

        if tracker.len() > want {
            return self
                .scale_down(fleet, tracker, want, &trigger.namespace)
                .await;
        }
        self.scale_up(fleet, tracker, want, &trigger.namespace).await
    }

    /// Create any missing pod in `1..=want` and persist the tracker
    async fn scale_up(
        &self,
        mut fleet: RedisFleet,
        mut tracker: OwnershipTracker,
        want: usize,
        namespace: &str,
    ) -> Result<ReconcileOutcome, Error> {
        let result = self
            .ensure_children(&fleet, &mut tracker, want, namespace)
            .await;

        match result {
            Ok(created) => {
                self.persist(&mut fleet, &tracker).await?;
                if created > 0 {
                    info!(created, replicas = want, "RedisFleet scaled up");
                }
                Ok(ReconcileOutcome::Converged { created })
            }
            Err(e) => {
                // Keep whatever was created before the failure tracked
                if let Err(update_err) = self.persist(&mut fleet, &tracker).await {
                    warn!(error = %update_err, "failed to record partially created pods");
                }
                Err(e)
            }
        }
    }

    /// Walk `1..=want`, creating pods that do not exist yet
    ///
    /// Returns the number of pods created. Stops at the first create error
    /// other than AlreadyExists.
    async fn ensure_children(
        &self,
        fleet: &RedisFleet,
        tracker: &mut OwnershipTracker,
        want: usize,
        namespace: &str,
    ) -> Result<usize, Error> {
        let fleet_name = fleet.name_any();
        let mut created = 0;

        for index in 1..=want {
            let name = child_name(&fleet_name, index);

            if let Some(existing) = self.store.get_child(namespace, &name).await? {
                if !tracker.contains(&name) {
                    if is_owned_by(&existing, fleet) {
                        debug!(pod = %name, "adopting existing pod into tracker");
                        tracker.track(&name);
                    } else {
                        warn!(pod = %name, "pod exists but is not owned by this RedisFleet, leaving it alone");
                    }
                }
                continue;
            }

            let pod = build_child_pod(fleet, &name, &self.child_image)?;
            match self.store.create_child(&pod).await {
                Ok(()) => {
                    info!(pod = %name, "created pod");
                    metrics::record_child_operation("create");
                    self.publish(
                        fleet,
                        EventType::Normal,
                        reasons::CHILD_CREATED,
                        actions::CREATE,
                        format!("Created pod {}", name),
                    )
                    .await;
                    created += 1;
                }
                Err(Error::AlreadyExists { .. }) => {
                    debug!(pod = %name, "pod was created concurrently");
                }
                Err(e) => {
                    error!(pod = %name, error = %e, "failed to create pod");
                    return Err(e);
                }
            }
            tracker.track(&name);
        }

        Ok(created)
    }

    /// Delete tracked pods outside `1..=want`, highest position first
    ///
    /// Surplus pods are picked by name rather than by position, so a pod
    /// left over from an earlier failed delete is removed even after newer
    /// entries were appended behind it. A failed delete keeps its tracker
    /// entry; the rest of the pass still runs, the tracker is persisted,
    /// and the first failure is returned.
    async fn scale_down(
        &self,
        mut fleet: RedisFleet,
        mut tracker: OwnershipTracker,
        want: usize,
        namespace: &str,
    ) -> Result<ReconcileOutcome, Error> {
        let have = tracker.len();
        info!(have, want, "scaling down RedisFleet");

        let mut first_error = None;
        let mut removed = 0;

        for position in tracker.surplus_positions(&fleet.name_any(), want) {
            let Some(name) = tracker.at(position).map(str::to_string) else {
                continue;
            };
            match self.delete_child(&fleet, namespace, &name).await {
                Ok(_) => {
                    tracker.remove_at(position);
                    removed += 1;
                }
                Err(e) => {
                    warn!(pod = %name, error = %e, "failed to delete pod during scale-down");
                    first_error.get_or_insert(e);
                }
            }
        }

        self.persist(&mut fleet, &tracker).await?;

        match first_error {
            Some(e) => Err(e),
            None => Ok(ReconcileOutcome::ScaledDown { removed }),
        }
    }

    /// Delete every tracked pod, then empty the tracker to release the fleet
    ///
    /// Any delete failure other than NotFound aborts the pass with the
    /// tracker untouched, so the next attempt starts over from the top.
    async fn teardown(
        &self,
        mut fleet: RedisFleet,
        namespace: &str,
    ) -> Result<ReconcileOutcome, Error> {
        let mut tracker = OwnershipTracker::from_fleet(&fleet);
        if tracker.is_empty() {
            debug!("RedisFleet is being deleted and tracks no pods");
            return Ok(ReconcileOutcome::TornDown { deleted: 0 });
        }

        info!(pods = tracker.len(), "RedisFleet is being deleted, removing its pods");

        let mut deleted = 0;
        for name in tracker.children() {
            if self.delete_child(&fleet, namespace, name).await? {
                deleted += 1;
            }
        }

        tracker.clear();
        self.persist(&mut fleet, &tracker).await?;

        self.publish(
            &fleet,
            EventType::Normal,
            reasons::TEARDOWN_COMPLETE,
            actions::TEARDOWN,
            format!("Deleted {} pods", deleted),
        )
        .await;
        info!(deleted, "RedisFleet teardown complete");

        Ok(ReconcileOutcome::TornDown { deleted })
    }

    /// Delete one pod; `Ok(false)` if it was already gone
    async fn delete_child(
        &self,
        fleet: &RedisFleet,
        namespace: &str,
        name: &str,
    ) -> Result<bool, Error> {
        match self.store.delete_child(namespace, name).await {
            Ok(()) => {
                info!(pod = %name, "deleted pod");
                metrics::record_child_operation("delete");
                self.publish(
                    fleet,
                    EventType::Normal,
                    reasons::CHILD_DELETED,
                    actions::DELETE,
                    format!("Deleted pod {}", name),
                )
                .await;
                Ok(true)
            }
            Err(Error::NotFound { .. }) => {
                debug!(pod = %name, "pod already gone");
                Ok(false)
            }
            Err(e) => {
                self.publish(
                    fleet,
                    EventType::Warning,
                    reasons::CHILD_DELETE_FAILED,
                    actions::DELETE,
                    format!("Failed to delete pod {}: {}", name, e),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Write the tracker back to the fleet if it changed
    async fn persist(
        &self,
        fleet: &mut RedisFleet,
        tracker: &OwnershipTracker,
    ) -> Result<(), Error> {
        if !tracker.apply_to(fleet) {
            return Ok(());
        }
        *fleet = self.store.update_fleet(fleet).await?;
        debug!(tracked = tracker.len(), "persisted ownership tracker");
        Ok(())
    }

    async fn publish(
        &self,
        fleet: &RedisFleet,
        type_: EventType,
        reason: &str,
        action: &str,
        note: String,
    ) {
        self.events
            .publish(&fleet.object_ref(&()), type_, reason, action, Some(note))
            .await;
    }
}

/// Shared context for the RedisFleet controller
pub struct Context {
    /// Reconciler driving fleets to their desired state
    pub reconciler: Reconciler,
    /// Consecutive failure tracking for requeue delays
    pub backoff: FailureBackoff,
}

impl Context {
    /// Create a context backed by the Kubernetes API
    pub fn new(client: Client, config: &ControllerConfig) -> Self {
        let store = Arc::new(KubeStore::new(client.clone()));
        let events = Arc::new(KubeEventPublisher::new(client, CONTROLLER_NAME));
        Self {
            reconciler: Reconciler::new(store, events, config.child_image.clone()),
            backoff: FailureBackoff::new(config.backoff_base(), config.backoff_max()),
        }
    }

    /// Create a context for tests with a custom store and no events
    #[cfg(test)]
    pub fn for_testing(store: Arc<dyn ResourceStore>) -> Self {
        let config = ControllerConfig::default();
        Self {
            reconciler: Reconciler::new(
                store,
                Arc::new(crate::events::NoopEventPublisher),
                config.child_image.clone(),
            ),
            backoff: FailureBackoff::new(config.backoff_base(), config.backoff_max()),
        }
    }
}

/// Reconcile a RedisFleet observed by the controller
///
/// The observed object only provides the key; the reconciler re-reads the
/// fleet so it always acts on the latest version. Success waits for the next
/// change instead of polling: updating the tracker and deleting a pod both
/// re-trigger the fleet.
pub async fn reconcile(fleet: Arc<RedisFleet>, ctx: Arc<Context>) -> Result<Action, Error> {
    let trigger = ReconcileTrigger::for_fleet(&fleet)?;
    let started = Instant::now();

    let result = ctx.reconciler.reconcile(&trigger).await;
    metrics::record_reconcile(
        started.elapsed().as_secs_f64(),
        result.as_ref().err().map(Error::kind_label),
    );

    let outcome = result?;
    ctx.backoff.on_success(&trigger.key());
    debug!(fleet = %trigger, ?outcome, "reconcile finished");
    Ok(Action::await_change())
}

/// Error policy for the controller
///
/// Retryable errors back off exponentially per fleet; permanent ones wait
/// the maximum delay until the RedisFleet spec is fixed.
pub fn error_policy(fleet: Arc<RedisFleet>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ReconcileTrigger::for_fleet(&fleet)
        .map(|t| t.key())
        .unwrap_or_else(|_| fleet.name_any());
    let retryable = error.is_retryable();
    let delay = ctx.backoff.on_failure(&key, retryable);

    error!(
        ?error,
        fleet = %key,
        retryable,
        failures = ctx.backoff.failures(&key),
        delay_secs = delay.as_secs(),
        "reconciliation failed"
    );

    Action::requeue(delay)
}
