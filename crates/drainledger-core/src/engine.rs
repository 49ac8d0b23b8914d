//! The attribution engine: one refresh cycle from snapshot to ledger.
//!
//! A refresh is synchronous and all-or-nothing. Intermediate results live
//! on the stack until reconciliation succeeds, so a failed cycle leaves
//! the previously published ledger fully readable.

use std::sync::Arc;

use log::debug;

use crate::aggregate;
use crate::estimator::{EstimatorError, EstimatorSet};
use crate::ledger::Ledger;
use crate::partition::Partition;
use crate::profile::PowerProfile;
use crate::provider::SnapshotProvider;
use crate::reconcile;
use crate::record::{DrainKind, DrainRecord, Subsystem};
use crate::snapshot::{AccountingPeriod, UsageSnapshot};
use crate::uid::UserFilter;
use crate::window::{ClockAnchors, CycleWindow};

/// Engine tunables, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum lower-bound discharge, in percentage points, before the
    /// coarse discharge counters carry enough signal to reconcile against.
    pub min_discharge_pct_for_reconcile: u32,
    /// The device has no cellular radio; suppresses the cell category.
    pub wifi_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_discharge_pct_for_reconcile: 2,
            wifi_only: false,
        }
    }
}

/// One refresh order: the period to account, the users to rank
/// individually, and optionally the caller's own clock anchors.
#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub period: AccountingPeriod,
    pub user_filter: UserFilter,
    /// Anchors for the cycle window; defaults to the snapshot's capture
    /// anchors, which keeps a refresh a pure function of its snapshot.
    pub anchors: Option<ClockAnchors>,
}

impl RefreshRequest {
    pub fn new(period: AccountingPeriod) -> Self {
        RefreshRequest {
            period,
            ..RefreshRequest::default()
        }
    }
}

/// Publication state of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
    /// No cycle has run; the ledger is the empty placeholder.
    #[default]
    Idle,
    /// At least one cycle has published a ledger.
    Published,
}

/// A refresh failure. The previously published ledger stays intact.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{subsystem} estimator failed")]
    Estimator {
        subsystem: Subsystem,
        source: EstimatorError,
    },
}

fn estimator_err(subsystem: Subsystem) -> impl FnOnce(EstimatorError) -> EngineError {
    move |source| EngineError::Estimator { subsystem, source }
}

/// Battery attribution engine over a snapshot provider.
///
/// Not internally synchronized. Wrap it in a lock for shared use; a
/// `refresh` call must complete before the next one starts.
pub struct DrainEngine<P> {
    profile: Arc<PowerProfile>,
    config: EngineConfig,
    provider: P,
    ledger: Ledger,
    state: EngineState,
}

impl<P: SnapshotProvider> DrainEngine<P> {
    pub fn new(profile: PowerProfile, provider: P) -> Self {
        DrainEngine::with_config(profile, provider, EngineConfig::default())
    }

    pub fn with_config(profile: PowerProfile, provider: P, config: EngineConfig) -> Self {
        DrainEngine {
            profile: Arc::new(profile),
            config,
            provider,
            ledger: Ledger::empty(AccountingPeriod::default()),
            state: EngineState::Idle,
        }
    }

    /// The last published ledger; the empty placeholder before any cycle.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profile(&self) -> &PowerProfile {
        &self.profile
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Run one attribution cycle and publish its ledger.
    ///
    /// An absent snapshot is not an error: the engine publishes the empty
    /// ledger for the requested period and reports it normally.
    pub fn refresh(&mut self, request: &RefreshRequest) -> Result<&Ledger, EngineError> {
        let Some(snapshot) = self.provider.latest() else {
            debug!("no snapshot available; publishing empty {} ledger", request.period);
            self.publish(Ledger::empty(request.period));
            return Ok(&self.ledger);
        };
        let ledger = self.compute(&snapshot, request)?;
        self.publish(ledger);
        Ok(&self.ledger)
    }

    fn publish(&mut self, ledger: Ledger) {
        self.ledger = ledger;
        self.state = EngineState::Published;
    }

    fn compute(
        &self,
        snapshot: &UsageSnapshot,
        request: &RefreshRequest,
    ) -> Result<Ledger, EngineError> {
        let anchors = request
            .anchors
            .unwrap_or_else(|| ClockAnchors::at_capture(snapshot));
        let window = CycleWindow::derive(
            snapshot,
            anchors,
            request.period,
            self.profile.battery_capacity_mah,
        );

        let mut estimators = EstimatorSet::resolve(&self.profile, snapshot);
        estimators.reset_all();

        let mut partition = Partition::new();
        for usage in &snapshot.uids {
            let mut record = DrainRecord::app(usage.uid, usage.label.clone());
            for estimator in estimators.slots_mut() {
                let subsystem = estimator.subsystem();
                let contribution = estimator
                    .estimate_app(usage, &window)
                    .map_err(estimator_err(subsystem))?;
                record.apply(subsystem, &contribution);
            }
            record.derive_app_usage_time();
            partition.place(record, &request.user_filter);
        }

        aggregate::absorb_unclaimed_wakelock(
            &mut partition,
            estimators.slot_mut(Subsystem::Wakelock),
            &window,
        )
        .map_err(estimator_err(Subsystem::Wakelock))?;

        // Ratios must be derived before user buckets collapse into rollups.
        let signaling =
            aggregate::signaling_records(&mut partition.default_list, &mut partition.by_user);

        let mut consumers = std::mem::take(&mut partition.default_list);
        consumers.extend(aggregate::user_rollups(&partition.by_user));
        consumers.extend(aggregate::phone_record(&self.profile, &window));
        consumers.extend(aggregate::screen_record(&self.profile, &window));
        consumers.extend(
            aggregate::subsystem_rollup(
                DrainKind::Wifi,
                Subsystem::Wifi,
                estimators.slot_mut(Subsystem::Wifi),
                &partition.wifi,
                &window,
            )
            .map_err(estimator_err(Subsystem::Wifi))?,
        );
        consumers.extend(
            aggregate::subsystem_rollup(
                DrainKind::Bluetooth,
                Subsystem::Bluetooth,
                estimators.slot_mut(Subsystem::Bluetooth),
                &partition.bluetooth,
                &window,
            )
            .map_err(estimator_err(Subsystem::Bluetooth))?,
        );
        consumers.extend(aggregate::idle_record(&self.profile, &window));
        if !self.config.wifi_only {
            consumers.extend(
                aggregate::cell_record(estimators.slot_mut(Subsystem::MobileRadio), &window)
                    .map_err(estimator_err(Subsystem::MobileRadio))?,
            );
        }

        let outcome = reconcile::reconcile(
            &mut consumers,
            &window,
            self.config.min_discharge_pct_for_reconcile,
        );
        debug!(
            "cycle complete: {} records, {:.3} mAh total over {}",
            consumers.len(),
            outcome.total_power_mah,
            request.period
        );

        Ok(Ledger {
            period: request.period,
            consumers,
            signaling,
            total_power_mah: outcome.total_power_mah,
            computed_power_mah: outcome.computed_power_mah,
            max_power_mah: outcome.max_power_mah,
            max_real_power_mah: outcome.max_real_power_mah,
            min_drained_power_mah: window.min_drained_mah,
            max_drained_power_mah: window.max_drained_mah,
            window,
        })
    }
}
