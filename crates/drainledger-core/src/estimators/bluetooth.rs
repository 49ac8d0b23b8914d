//! Bluetooth pricing: the same tagged choice as wifi.
//!
//! Without hardware controller reporting there is no per-uid attribution
//! at all; the modeled variant prices the whole bluetooth-on duration as
//! remainder, and the rollup carries it.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::{UidUsage, UsageSnapshot};
use crate::window::CycleWindow;

pub enum BluetoothEstimator {
    Reported { profile: Arc<PowerProfile>, attributed_power_mah: f64, attributed_time_ms: u64 },
    Modeled { profile: Arc<PowerProfile> },
}

impl BluetoothEstimator {
    /// Pick the variant for this cycle from the capability checks.
    pub fn for_capabilities(profile: Arc<PowerProfile>, snapshot: &UsageSnapshot) -> Self {
        if snapshot.has_bluetooth_activity_reporting && profile.has_bluetooth_controller_power() {
            BluetoothEstimator::Reported {
                profile,
                attributed_power_mah: 0.0,
                attributed_time_ms: 0,
            }
        } else {
            BluetoothEstimator::Modeled { profile }
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, BluetoothEstimator::Reported { .. })
    }
}

impl PowerEstimator for BluetoothEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Bluetooth
    }

    fn reset(&mut self) {
        if let BluetoothEstimator::Reported { attributed_power_mah, attributed_time_ms, .. } = self
        {
            *attributed_power_mah = 0.0;
            *attributed_time_ms = 0;
        }
    }

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        match self {
            BluetoothEstimator::Reported { profile, attributed_power_mah, attributed_time_ms } => {
                let idle_ms =
                    us_to_ms(usage.bluetooth_controller.idle_time_us.since(window.period));
                let rx_ms = us_to_ms(usage.bluetooth_controller.rx_time_us.since(window.period));
                let tx_ms = us_to_ms(usage.bluetooth_controller.tx_time_us.since(window.period));
                let power = mah_from_ma_ms(profile.bluetooth_controller_idle_ma, idle_ms)
                    + mah_from_ma_ms(profile.bluetooth_controller_rx_ma, rx_ms)
                    + mah_from_ma_ms(profile.bluetooth_controller_tx_ma, tx_ms);
                let time_ms = idle_ms + rx_ms + tx_ms;
                let power = sanitize_power(Subsystem::Bluetooth, power);
                *attributed_power_mah += power;
                *attributed_time_ms += time_ms;
                Ok(Contribution::new(power, time_ms))
            }
            BluetoothEstimator::Modeled { .. } => Ok(Contribution::zero()),
        }
    }

    fn estimate_remainder(&mut self, window: &CycleWindow) -> Result<Contribution, EstimatorError> {
        match self {
            BluetoothEstimator::Reported { profile, attributed_power_mah, attributed_time_ms } => {
                let idle_ms = us_to_ms(window.bluetooth_controller.idle_time_us);
                let rx_ms = us_to_ms(window.bluetooth_controller.rx_time_us);
                let tx_ms = us_to_ms(window.bluetooth_controller.tx_time_us);
                let device_power = mah_from_ma_ms(profile.bluetooth_controller_idle_ma, idle_ms)
                    + mah_from_ma_ms(profile.bluetooth_controller_rx_ma, rx_ms)
                    + mah_from_ma_ms(profile.bluetooth_controller_tx_ma, tx_ms);
                let power = (device_power - *attributed_power_mah).max(0.0);
                let time_ms = (idle_ms + rx_ms + tx_ms).saturating_sub(*attributed_time_ms);
                Ok(Contribution::new(sanitize_power(Subsystem::Bluetooth, power), time_ms))
            }
            BluetoothEstimator::Modeled { profile } => {
                let on_ms = us_to_ms(window.bluetooth_on_time_us);
                let power = mah_from_ma_ms(profile.bluetooth_on_ma, on_ms);
                Ok(Contribution::new(sanitize_power(Subsystem::Bluetooth, power), on_ms))
            }
        }
    }
}
