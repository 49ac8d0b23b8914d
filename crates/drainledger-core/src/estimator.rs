//! Subsystem estimator contract.
//!
//! Each estimator prices one subsystem: a per-consumer share from that
//! consumer's raw counters, and one subsystem-wide remainder nothing can be
//! attributed to. Estimators are stateless between cycles apart from the
//! accumulation `reset()` clears, and they are swappable: the engine
//! resolves the concrete set once per cycle from capability checks without
//! touching the rest of the pipeline.
//!
//! Recoverable problems (missing counters, unpriced features, non-finite
//! intermediate values) yield a zero contribution. Only genuinely
//! impossible model states are errors, and an error aborts the whole cycle
//! while the previously published ledger stays up.

use std::sync::Arc;

use log::warn;

use crate::estimators::{
    BluetoothEstimator, CameraEstimator, CpuEstimator, FlashlightEstimator, MobileRadioEstimator,
    SensorEstimator, WakelockEstimator, WifiEstimator,
};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::{UidUsage, UsageSnapshot};
use crate::window::CycleWindow;

/// Unrecoverable estimator failure. Fatal to the refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimatorError {
    #[error("snapshot reports {snapshot_steps} cpu speed steps but the profile prices {profile_steps}")]
    CpuStepMismatch { snapshot_steps: usize, profile_steps: usize },
}

/// One subsystem's pricing model.
pub trait PowerEstimator: Send + Sync {
    /// The slot this estimator prices.
    fn subsystem(&self) -> Subsystem;

    /// Clear per-cycle accumulation state. Called once before each cycle.
    fn reset(&mut self);

    /// Price one consumer's share from its counters over `window`.
    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError>;

    /// Price the subsystem-wide remainder no consumer accounts for. Called
    /// once per cycle, after every `estimate_app` call.
    fn estimate_remainder(&mut self, window: &CycleWindow)
    -> Result<Contribution, EstimatorError>;
}

/// Convert an average draw held for a duration into charge.
pub(crate) fn mah_from_ma_ms(ma: f64, ms: u64) -> f64 {
    ma * ms as f64 / 3_600_000.0
}

pub(crate) fn us_to_ms(us: u64) -> u64 {
    us / 1_000
}

/// Clamp a computed estimate to something the ledger can hold. Non-finite
/// or negative values are recoverable model noise: logged, then priced at
/// zero.
pub(crate) fn sanitize_power(subsystem: Subsystem, power_mah: f64) -> f64 {
    if !power_mah.is_finite() || power_mah < 0.0 {
        warn!("{subsystem} estimator produced unusable power {power_mah}, using 0");
        0.0
    } else {
        power_mah
    }
}

/// The per-cycle estimator table, one slot per subsystem, in invocation
/// order.
pub struct EstimatorSet {
    pub cpu: Box<dyn PowerEstimator>,
    pub wakelock: Box<dyn PowerEstimator>,
    pub mobile_radio: Box<dyn PowerEstimator>,
    pub wifi: Box<dyn PowerEstimator>,
    pub bluetooth: Box<dyn PowerEstimator>,
    pub sensors: Box<dyn PowerEstimator>,
    pub camera: Box<dyn PowerEstimator>,
    pub flashlight: Box<dyn PowerEstimator>,
}

impl EstimatorSet {
    /// Build the concrete set for one cycle. The wifi and bluetooth slots
    /// are tagged choices resolved from capability checks: hardware
    /// activity reporting is used only when the snapshot carries it and
    /// the profile prices it.
    pub fn resolve(profile: &Arc<PowerProfile>, snapshot: &UsageSnapshot) -> Self {
        EstimatorSet {
            cpu: Box::new(CpuEstimator::new(profile.clone())),
            wakelock: Box::new(WakelockEstimator::new(profile.clone())),
            mobile_radio: Box::new(MobileRadioEstimator::new(profile.clone())),
            wifi: Box::new(WifiEstimator::for_capabilities(profile.clone(), snapshot)),
            bluetooth: Box::new(BluetoothEstimator::for_capabilities(profile.clone(), snapshot)),
            sensors: Box::new(SensorEstimator::new(profile.clone())),
            camera: Box::new(CameraEstimator::new(profile.clone())),
            flashlight: Box::new(FlashlightEstimator::new(profile.clone())),
        }
    }

    /// The slots in fixed invocation order.
    pub fn slots_mut(&mut self) -> [&mut dyn PowerEstimator; 8] {
        [
            self.cpu.as_mut(),
            self.wakelock.as_mut(),
            self.mobile_radio.as_mut(),
            self.wifi.as_mut(),
            self.bluetooth.as_mut(),
            self.sensors.as_mut(),
            self.camera.as_mut(),
            self.flashlight.as_mut(),
        ]
    }

    pub fn slot_mut(&mut self, subsystem: Subsystem) -> &mut dyn PowerEstimator {
        match subsystem {
            Subsystem::Cpu => self.cpu.as_mut(),
            Subsystem::Wakelock => self.wakelock.as_mut(),
            Subsystem::MobileRadio => self.mobile_radio.as_mut(),
            Subsystem::Wifi => self.wifi.as_mut(),
            Subsystem::Bluetooth => self.bluetooth.as_mut(),
            Subsystem::Sensors => self.sensors.as_mut(),
            Subsystem::Camera => self.camera.as_mut(),
            Subsystem::Flashlight => self.flashlight.as_mut(),
        }
    }

    pub fn reset_all(&mut self) {
        for slot in self.slots_mut() {
            slot.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Subsystem;

    #[test]
    fn slots_follow_subsystem_order() {
        let profile = Arc::new(PowerProfile::reference());
        let mut set = EstimatorSet::resolve(&profile, &UsageSnapshot::default());
        let order: Vec<Subsystem> = set.slots_mut().into_iter().map(|s| s.subsystem()).collect();
        assert_eq!(order, Subsystem::ALL.to_vec());
    }

    #[test]
    fn sanitize_rejects_nan_and_negative() {
        assert_eq!(sanitize_power(Subsystem::Cpu, f64::NAN), 0.0);
        assert_eq!(sanitize_power(Subsystem::Cpu, -3.0), 0.0);
        assert_eq!(sanitize_power(Subsystem::Cpu, 1.5), 1.5);
    }

    #[test]
    fn charge_conversion() {
        // 100 mA held for one hour is 100 mAh.
        assert!((mah_from_ma_ms(100.0, 3_600_000) - 100.0).abs() < 1e-12);
        assert_eq!(mah_from_ma_ms(100.0, 0), 0.0);
    }
}
