//! Cellular radio pricing.
//!
//! Consumers with tracked radio-active time are priced directly at the
//! active draw. Consumers with traffic but no active-time tracking are
//! priced per packet, using the device-wide packet rate when the window
//! observed one and a nominal throughput otherwise. The remainder covers
//! camping on the signal (per strength bin), scanning, and radio-active
//! time no consumer claimed.

use std::sync::Arc;

use crate::estimator::{EstimatorError, PowerEstimator, mah_from_ma_ms, sanitize_power, us_to_ms};
use crate::profile::PowerProfile;
use crate::record::{Contribution, Subsystem};
use crate::snapshot::UidUsage;
use crate::window::CycleWindow;

/// Nominal mobile link throughput used when the window has no observed
/// packet rate.
const NOMINAL_MOBILE_BPS: f64 = 200_000.0;
/// Assumed average packet size for the nominal rate.
const AVG_PACKET_BYTES: f64 = 2_048.0;

pub struct MobileRadioEstimator {
    profile: Arc<PowerProfile>,
    total_app_active_ms: u64,
}

impl MobileRadioEstimator {
    pub fn new(profile: Arc<PowerProfile>) -> Self {
        MobileRadioEstimator { profile, total_app_active_ms: 0 }
    }

    /// Charge per packet, mAh. Derived from the active draw and the
    /// packets-per-second the device sustained while the radio was active.
    fn mah_per_packet(&self, window: &CycleWindow) -> f64 {
        let packets = window.mobile_rx_packets + window.mobile_tx_packets;
        let active_ms = us_to_ms(window.mobile_radio_active_time_us);
        let pps = if packets > 0 && active_ms > 0 {
            packets as f64 / (active_ms as f64 / 1_000.0)
        } else {
            NOMINAL_MOBILE_BPS / 8.0 / AVG_PACKET_BYTES
        };
        if pps <= 0.0 {
            return 0.0;
        }
        self.profile.radio_active_ma / 3_600.0 / pps
    }
}

impl PowerEstimator for MobileRadioEstimator {
    fn subsystem(&self) -> Subsystem {
        Subsystem::MobileRadio
    }

    fn reset(&mut self) {
        self.total_app_active_ms = 0;
    }

    fn estimate_app(
        &mut self,
        usage: &UidUsage,
        window: &CycleWindow,
    ) -> Result<Contribution, EstimatorError> {
        let active_ms = us_to_ms(usage.mobile_active_time_us.since(window.period));
        let rx = usage.mobile_rx_packets.since(window.period);
        let tx = usage.mobile_tx_packets.since(window.period);

        let power = if active_ms > 0 {
            self.total_app_active_ms += active_ms;
            mah_from_ma_ms(self.profile.radio_active_ma, active_ms)
        } else {
            (rx + tx) as f64 * self.mah_per_packet(window)
        };

        Ok(Contribution {
            power_mah: sanitize_power(Subsystem::MobileRadio, power),
            time_ms: active_ms,
            rx_packets: rx,
            tx_packets: tx,
        })
    }

    fn estimate_remainder(&mut self, window: &CycleWindow) -> Result<Contribution, EstimatorError> {
        let mut power = 0.0;
        for (bin, t_us) in window.phone_signal_strength_time_us.iter().enumerate() {
            power += mah_from_ma_ms(self.profile.radio_on_ma(bin), us_to_ms(*t_us));
        }
        power += mah_from_ma_ms(
            self.profile.radio_scanning_ma,
            us_to_ms(window.phone_signal_scanning_time_us),
        );

        let unclaimed_ms =
            us_to_ms(window.mobile_radio_active_time_us).saturating_sub(self.total_app_active_ms);
        power += mah_from_ma_ms(self.profile.radio_active_ma, unclaimed_ms);

        Ok(Contribution::new(sanitize_power(Subsystem::MobileRadio, power), unclaimed_ms))
    }
}
