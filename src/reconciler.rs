//! The reconciliation pass.
//!
//! Events from the host mutate the peer directory and then run one pass:
//! gate on runtime connectivity, gate on the unit's own address, publish
//! that address for peers, render the desired service layer, diff it
//! against what is running, and apply/restart as needed. Passes are
//! serialized by the host and run to completion; redelivering the same
//! event is harmless.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::directory::PeerDirectory;
use crate::error::Error;
use crate::layer;
use crate::relation::{RelationStore, FIELD_PRIVATE_ADDRESS};
use crate::runtime::WorkloadController;
use crate::types::{Event, ReconcileOutcome, UnitId, UnitStatus};

pub struct Reconciler<C, S> {
    settings: Config,
    controller: Arc<C>,
    relation: Arc<S>,
    directory: Arc<RwLock<PeerDirectory>>,
}

impl<C, S> Reconciler<C, S>
where
    C: WorkloadController,
    S: RelationStore,
{
    pub fn new(own_unit: UnitId, settings: Config, controller: Arc<C>, relation: Arc<S>) -> Self {
        Self {
            settings,
            controller,
            relation,
            directory: Arc::new(RwLock::new(PeerDirectory::new(own_unit))),
        }
    }

    /// Shared handle to the directory, for wiring up action handlers.
    pub fn directory(&self) -> Arc<RwLock<PeerDirectory>> {
        Arc::clone(&self.directory)
    }

    /// Entry point for every reconcile trigger.
    pub async fn reconcile(&mut self, event: Event) -> ReconcileOutcome {
        match event {
            Event::ConfigChanged(config) => {
                info!("config changed: {:?}", config);
                self.settings = config;
            }
            Event::PeerJoined { unit } | Event::PeerChanged { unit } => {
                // The peer publishes its address under its own key; it
                // may not have done so yet, in which case upsert is a
                // no-op and a later change event completes the entry.
                let address = self.relation.read(&unit, FIELD_PRIVATE_ADDRESS);
                self.directory.write().await.upsert_peer(unit, address);
            }
            Event::PeerDeparted { unit } => {
                self.directory.write().await.remove_peer(&unit);
            }
            Event::WorkloadReady | Event::Start | Event::LeaderElected => {}
        }
        self.pass().await
    }

    async fn pass(&mut self) -> ReconcileOutcome {
        if !self.controller.is_connected().await {
            return ReconcileOutcome::waiting("runtime not ready");
        }

        let self_address = {
            let mut dir = self.directory.write().await;
            dir.observe_self_address(self.relation.bind_address());
            dir.self_address().map(str::to_string)
        };
        let Some(self_address) = self_address else {
            return ReconcileOutcome::waiting("address not yet assigned");
        };

        // Republished on every pass; the binding value is not guaranteed
        // stable across events.
        self.relation.write_own(FIELD_PRIVATE_ADDRESS, &self_address);

        let (peer_addresses, have_peers) = {
            let dir = self.directory.read().await;
            (dir.peer_addresses(self.settings.port), !dir.is_empty())
        };
        let desired = layer::render(&self.settings, &peer_addresses);

        let current = match self.controller.current_config().await {
            Ok(current) => current,
            Err(err) => return Self::fail(err, false),
        };

        let mut changed = false;
        if current.as_ref() != Some(&desired) {
            if let Err(err) = self.controller.apply(desired).await {
                return Self::fail(err, false);
            }
            info!("updated {} layer ({} peers)", layer::SERVICE_NAME, peer_addresses.len());
            changed = true;
        }

        // A lone unit that is already running keeps its process across a
        // layer update; anything else that changed must pick the new
        // peer list up.
        let running = self.controller.is_running().await;
        let mut restarted = false;
        if changed && (!running || have_peers) {
            match self.controller.restart().await {
                Ok(()) => {
                    info!("restarted service {}", layer::SERVICE_NAME);
                    restarted = true;
                }
                Err(err) => {
                    warn!("restart failed: {err}");
                    return Self::fail(err, changed);
                }
            }
        }

        ReconcileOutcome {
            status: UnitStatus::Active,
            changed,
            restarted,
        }
    }

    fn fail(err: Error, changed: bool) -> ReconcileOutcome {
        let status = if err.is_transient() {
            UnitStatus::Waiting(err.to_string())
        } else {
            UnitStatus::Blocked(err.to_string())
        };
        ReconcileOutcome {
            status,
            changed,
            restarted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::InMemoryRelation;
    use crate::runtime::InMemoryWorkload;

    type TestReconciler = Reconciler<InMemoryWorkload, InMemoryRelation>;

    fn setup() -> (TestReconciler, Arc<InMemoryWorkload>, Arc<InMemoryRelation>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let workload = Arc::new(InMemoryWorkload::new());
        let relation = Arc::new(InMemoryRelation::new(UnitId::from("char/0")));
        let reconciler = Reconciler::new(
            UnitId::from("char/0"),
            Config::default(),
            Arc::clone(&workload),
            Arc::clone(&relation),
        );
        (reconciler, workload, relation)
    }

    /// Drive the unit to a configured, running state.
    async fn converge(reconciler: &mut TestReconciler) -> ReconcileOutcome {
        reconciler.reconcile(Event::Start).await
    }

    #[tokio::test]
    async fn waits_while_runtime_is_unreachable() {
        let (mut reconciler, _workload, relation) = setup();
        relation.set_bind_address(Some("10.0.0.1".into()));

        let outcome = reconciler.reconcile(Event::Start).await;
        assert_eq!(outcome, ReconcileOutcome::waiting("runtime not ready"));
    }

    #[tokio::test]
    async fn waits_until_own_address_is_known() {
        let (mut reconciler, workload, _relation) = setup();
        workload.set_connected(true).await;

        for event in [Event::Start, Event::WorkloadReady, Event::LeaderElected] {
            let outcome = reconciler.reconcile(event).await;
            assert_eq!(outcome.status, UnitStatus::Waiting("address not yet assigned".into()));
            assert!(!outcome.changed);
            assert!(!outcome.restarted);
        }
    }

    #[tokio::test]
    async fn first_pass_configures_and_starts_the_service() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));

        let outcome = converge(&mut reconciler).await;
        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(outcome.changed);
        assert!(outcome.restarted);
        assert!(workload.is_running().await);

        let applied = workload.applied_config().await.unwrap();
        assert_eq!(applied.environment[layer::ENV_ENEMIES], "");
    }

    #[tokio::test]
    async fn second_pass_with_unchanged_inputs_is_a_no_op() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        let outcome = reconciler.reconcile(Event::Start).await;
        assert_eq!(
            outcome,
            ReconcileOutcome {
                status: UnitStatus::Active,
                changed: false,
                restarted: false,
            }
        );
        assert_eq!(workload.restart_count().await, 1);
    }

    #[tokio::test]
    async fn self_address_is_published_on_every_pass() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;
        assert_eq!(
            relation.read(&UnitId::from("char/0"), FIELD_PRIVATE_ADDRESS),
            Some("10.0.0.1".to_string())
        );

        // the binding moved; the next pass republishes the new value
        relation.set_bind_address(Some("10.0.0.9".into()));
        reconciler.reconcile(Event::Start).await;
        assert_eq!(
            relation.read(&UnitId::from("char/0"), FIELD_PRIVATE_ADDRESS),
            Some("10.0.0.9".to_string())
        );
    }

    #[tokio::test]
    async fn joined_peer_lands_in_the_layer_and_forces_restart() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        relation.publish_peer(UnitId::from("char/1"), FIELD_PRIVATE_ADDRESS, "10.0.0.5");
        let outcome = reconciler
            .reconcile(Event::PeerChanged { unit: UnitId::from("char/1") })
            .await;

        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(outcome.changed);
        assert!(outcome.restarted);
        let applied = workload.applied_config().await.unwrap();
        assert_eq!(applied.environment[layer::ENV_ENEMIES], "10.0.0.5:8080");
    }

    #[tokio::test]
    async fn joined_peer_without_address_changes_nothing() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        let outcome = reconciler
            .reconcile(Event::PeerJoined { unit: UnitId::from("char/1") })
            .await;
        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(!outcome.changed);
        assert!(!outcome.restarted);
    }

    #[tokio::test]
    async fn config_change_without_peers_updates_but_does_not_restart() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        let outcome = reconciler
            .reconcile(Event::ConfigChanged(Config {
                display_name: "bjorn".into(),
                ..Config::default()
            }))
            .await;

        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(outcome.changed);
        assert!(!outcome.restarted);
        assert_eq!(workload.restart_count().await, 1);
    }

    #[tokio::test]
    async fn config_change_with_peers_restarts() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        relation.publish_peer(UnitId::from("char/1"), FIELD_PRIVATE_ADDRESS, "10.0.0.5");
        reconciler
            .reconcile(Event::PeerJoined { unit: UnitId::from("char/1") })
            .await;
        assert_eq!(workload.restart_count().await, 2);

        let outcome = reconciler
            .reconcile(Event::ConfigChanged(Config {
                log_level: "DEBUG".into(),
                ..Config::default()
            }))
            .await;
        assert!(outcome.changed);
        assert!(outcome.restarted);
        assert_eq!(workload.restart_count().await, 3);
    }

    #[tokio::test]
    async fn dead_lone_unit_is_restarted_on_change() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        workload.kill_service().await;
        let outcome = reconciler
            .reconcile(Event::ConfigChanged(Config {
                display_name: "ragnar".into(),
                ..Config::default()
            }))
            .await;

        assert!(outcome.changed);
        assert!(outcome.restarted);
        assert!(workload.is_running().await);
    }

    /// Peers going non-empty to empty is still a layer change, but with
    /// the service running and no peers left there is nothing a restart
    /// would pick up.
    #[tokio::test]
    async fn last_peer_departing_updates_layer_without_restart() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));
        converge(&mut reconciler).await;

        relation.publish_peer(UnitId::from("char/1"), FIELD_PRIVATE_ADDRESS, "10.0.0.5");
        reconciler
            .reconcile(Event::PeerChanged { unit: UnitId::from("char/1") })
            .await;
        let restarts_before = workload.restart_count().await;

        let outcome = reconciler
            .reconcile(Event::PeerDeparted { unit: UnitId::from("char/1") })
            .await;

        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(outcome.changed);
        assert!(!outcome.restarted);
        assert_eq!(workload.restart_count().await, restarts_before);
        let applied = workload.applied_config().await.unwrap();
        assert_eq!(applied.environment[layer::ENV_ENEMIES], "");
    }

    #[tokio::test]
    async fn restart_failure_keeps_status_waiting() {
        let (mut reconciler, workload, relation) = setup();
        workload.set_connected(true).await;
        relation.set_bind_address(Some("10.0.0.1".into()));

        workload
            .fail_next_restart(Error::Unavailable("runtime hiccup".into()))
            .await;
        let outcome = converge(&mut reconciler).await;

        assert!(matches!(outcome.status, UnitStatus::Waiting(_)));
        assert!(outcome.changed);
        assert!(!outcome.restarted);

        // a later layer change picks the stopped service back up: it is
        // not running, so any change forces the restart
        relation.publish_peer(UnitId::from("char/1"), FIELD_PRIVATE_ADDRESS, "10.0.0.5");
        let outcome = reconciler
            .reconcile(Event::PeerChanged { unit: UnitId::from("char/1") })
            .await;
        assert_eq!(outcome.status, UnitStatus::Active);
        assert!(outcome.restarted);
        assert!(workload.is_running().await);
    }
}
