//! Wifi pricing: a tagged choice resolved per cycle.
//!
//! `Reported` trusts per-uid controller activity from the hardware and is
//! selected only when the snapshot carries that data and the profile
//! prices all three controller states. `Modeled` is the fallback built on
//! the wifi running/scan timers every snapshot has.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::{UidUsage, UsageSnapshot};
use crate::window::CycleWindow;

pub enum WifiEstimator {
    Reported { profile: Arc<PowerProfile>, attributed_power_mah: f64, attributed_time_ms: u64 },
    Modeled { profile: Arc<PowerProfile>, attributed_running_ms: u64 },
}

impl WifiEstimator {
    /// Pick the variant for this cycle from the capability checks.
    pub fn for_capabilities(profile: Arc<PowerProfile>, snapshot: &UsageSnapshot) -> Self {
        if snapshot.has_wifi_activity_reporting && profile.has_wifi_controller_power() {
            WifiEstimator::Reported { profile, attributed_power_mah: 0.0, attributed_time_ms: 0 }
        } else {
            WifiEstimator::Modeled { profile, attributed_running_ms: 0 }
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, WifiEstimator::Reported { .. })
    }
}

impl PowerEstimator for WifiEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Wifi
    }

    fn reset(&mut self) {
        match self {
            WifiEstimator::Reported { attributed_power_mah, attributed_time_ms, .. } => {
                *attributed_power_mah = 0.0;
                *attributed_time_ms = 0;
            }
            WifiEstimator::Modeled { attributed_running_ms, .. } => *attributed_running_ms = 0,
        }
    }

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        match self {
            WifiEstimator::Reported { profile, attributed_power_mah, attributed_time_ms } => {
                let idle_ms = us_to_ms(usage.wifi_controller.idle_time_us.since(window.period));
                let rx_ms = us_to_ms(usage.wifi_controller.rx_time_us.since(window.period));
                let tx_ms = us_to_ms(usage.wifi_controller.tx_time_us.since(window.period));
                let power = mah_from_ma_ms(profile.wifi_controller_idle_ma, idle_ms)
                    + mah_from_ma_ms(profile.wifi_controller_rx_ma, rx_ms)
                    + mah_from_ma_ms(profile.wifi_controller_tx_ma, tx_ms);
                let time_ms = idle_ms + rx_ms + tx_ms;
                let power = sanitize_power(Subsystem::Wifi, power);
                *attributed_power_mah += power;
                *attributed_time_ms += time_ms;
                Ok(Contribution::new(power, time_ms))
            }
            WifiEstimator::Modeled { profile, attributed_running_ms } => {
                let running_ms = us_to_ms(usage.wifi_running_time_us.since(window.period));
                let scan_ms = us_to_ms(usage.wifi_scan_time_us.since(window.period));
                let power = mah_from_ma_ms(profile.wifi_on_ma, running_ms)
                    + mah_from_ma_ms(profile.wifi_scan_ma, scan_ms);
                *attributed_running_ms += running_ms;
                Ok(Contribution::new(sanitize_power(Subsystem::Wifi, power), running_ms))
            }
        }
    }

    fn estimate_remainder(&mut self, window: &CycleWindow) -> Result<Contribution, EstimatorError> {
        match self {
            WifiEstimator::Reported { profile, attributed_power_mah, attributed_time_ms } => {
                let idle_ms = us_to_ms(window.wifi_controller.idle_time_us);
                let rx_ms = us_to_ms(window.wifi_controller.rx_time_us);
                let tx_ms = us_to_ms(window.wifi_controller.tx_time_us);
                let device_power = mah_from_ma_ms(profile.wifi_controller_idle_ma, idle_ms)
                    + mah_from_ma_ms(profile.wifi_controller_rx_ma, rx_ms)
                    + mah_from_ma_ms(profile.wifi_controller_tx_ma, tx_ms);
                let power = (device_power - *attributed_power_mah).max(0.0);
                let time_ms = (idle_ms + rx_ms + tx_ms).saturating_sub(*attributed_time_ms);
                Ok(Contribution::new(sanitize_power(Subsystem::Wifi, power), time_ms))
            }
            WifiEstimator::Modeled { profile, attributed_running_ms } => {
                let remaining_ms = us_to_ms(window.global_wifi_running_time_us)
                    .saturating_sub(*attributed_running_ms);
                let power = mah_from_ma_ms(profile.wifi_on_ma, remaining_ms);
                Ok(Contribution::new(sanitize_power(Subsystem::Wifi, power), remaining_ms))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AccountingPeriod, ControllerActivity, Scoped};
    use crate::uid::Uid;

    fn window() -> CycleWindow {
        CycleWindow::zero(AccountingPeriod::SinceCharged)
    }

    #[test]
    fn capability_check_picks_the_variant() {
        let profile = Arc::new(PowerProfile::reference());
        let mut snap = UsageSnapshot { has_wifi_activity_reporting: true, ..Default::default() };
        assert!(WifiEstimator::for_capabilities(profile.clone(), &snap).is_reported());

        snap.has_wifi_activity_reporting = false;
        assert!(!WifiEstimator::for_capabilities(profile.clone(), &snap).is_reported());

        // Reporting without priced coefficients is not trusted.
        let mut unpriced = PowerProfile::reference();
        unpriced.wifi_controller_rx_ma = 0.0;
        snap.has_wifi_activity_reporting = true;
        assert!(!WifiEstimator::for_capabilities(Arc::new(unpriced), &snap).is_reported());
    }

    #[test]
    fn reported_prices_controller_states() {
        let profile = Arc::new(PowerProfile::reference());
        let snap = UsageSnapshot { has_wifi_activity_reporting: true, ..Default::default() };
        let mut est = WifiEstimator::for_capabilities(profile, &snap);
        let usage = UidUsage {
            uid: Uid(10_001),
            wifi_controller: ControllerActivity {
                idle_time_us: Scoped::new(3_600_000_000),
                rx_time_us: Scoped::new(360_000_000),
                tx_time_us: Scoped::new(36_000_000),
            },
            ..Default::default()
        };
        let c = est.estimate_app(&usage, &window()).unwrap();
        // 1h idle @3 + 6min rx @100 + 36s tx @250.
        let expected = 3.0 + 10.0 + 2.5;
        assert!((c.power_mah - expected).abs() < 1e-9);
        assert_eq!(c.time_ms, 3_600_000 + 360_000 + 36_000);
    }

    #[test]
    fn reported_remainder_is_device_minus_attributed() {
        let profile = Arc::new(PowerProfile::reference());
        let snap = UsageSnapshot { has_wifi_activity_reporting: true, ..Default::default() };
        let mut est = WifiEstimator::for_capabilities(profile, &snap);
        let w = CycleWindow {
            wifi_controller: crate::window::ControllerWindow {
                idle_time_us: 7_200_000_000,
                rx_time_us: 0,
                tx_time_us: 0,
            },
            ..window()
        };
        let usage = UidUsage {
            uid: Uid(10_001),
            wifi_controller: ControllerActivity {
                idle_time_us: Scoped::new(3_600_000_000),
                ..Default::default()
            },
            ..Default::default()
        };
        est.estimate_app(&usage, &w).unwrap();
        let rem = est.estimate_remainder(&w).unwrap();
        assert!((rem.power_mah - 3.0).abs() < 1e-9);
        assert_eq!(rem.time_ms, 3_600_000);
    }

    #[test]
    fn reported_remainder_never_goes_negative() {
        let profile = Arc::new(PowerProfile::reference());
        let snap = UsageSnapshot { has_wifi_activity_reporting: true, ..Default::default() };
        let mut est = WifiEstimator::for_capabilities(profile, &snap);
        // Apps claim more than the device-wide totals show.
        let usage = UidUsage {
            uid: Uid(10_001),
            wifi_controller: ControllerActivity {
                idle_time_us: Scoped::new(3_600_000_000),
                ..Default::default()
            },
            ..Default::default()
        };
        est.estimate_app(&usage, &window()).unwrap();
        let rem = est.estimate_remainder(&window()).unwrap();
        assert_eq!(rem.power_mah, 0.0);
        assert_eq!(rem.time_ms, 0);
    }

    #[test]
    fn modeled_prices_running_and_scan_and_leftover() {
        let profile = Arc::new(PowerProfile::reference());
        let mut est = WifiEstimator::for_capabilities(profile, &UsageSnapshot::default());
        let w = CycleWindow { global_wifi_running_time_us: 7_200_000_000, ..window() };
        let usage = UidUsage {
            uid: Uid(10_001),
            wifi_running_time_us: Scoped::new(3_600_000_000),
            wifi_scan_time_us: Scoped::new(36_000_000),
            ..Default::default()
        };
        let c = est.estimate_app(&usage, &w).unwrap();
        // 1h running @2 + 36s scanning @100.
        assert!((c.power_mah - 3.0).abs() < 1e-9);

        let rem = est.estimate_remainder(&w).unwrap();
        assert_eq!(rem.time_ms, 3_600_000);
        assert!((rem.power_mah - 2.0).abs() < 1e-9);
    }
}
