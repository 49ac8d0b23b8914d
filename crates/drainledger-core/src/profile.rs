//! Static per-device power coefficient table.
//!
//! Average draw figures in milliamps for every subsystem the estimators
//! price, plus the full battery capacity. The table is read-only for the
//! engine; it ships with devices and loads from a JSON document here.
//!
//! A constant of `0` means "feature unsupported on this device": estimators
//! price the feature at nothing and capability checks that would trust
//! hardware reporting are suppressed.

use std::collections::BTreeMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

/// Coefficient table load failure.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read power profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse power profile: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-device average power draw table. All draw figures in mA, capacity
/// in mAh. Missing fields deserialize to zero (unsupported).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerProfile {
    pub battery_capacity_mah: f64,

    pub cpu_idle_ma: f64,
    /// Draw while the cpu is awake holding a wakelock, screen off.
    pub cpu_awake_ma: f64,
    /// Draw per cpu speed step, slowest first. Aligned with the snapshot's
    /// per-uid `cpu_step_times_us`.
    pub cpu_active_ma: Vec<f64>,

    pub screen_on_ma: f64,
    /// Additional draw at full brightness over `screen_on_ma`.
    pub screen_full_ma: f64,

    pub wifi_on_ma: f64,
    pub wifi_scan_ma: f64,
    pub wifi_controller_idle_ma: f64,
    pub wifi_controller_rx_ma: f64,
    pub wifi_controller_tx_ma: f64,

    pub bluetooth_on_ma: f64,
    pub bluetooth_controller_idle_ma: f64,
    pub bluetooth_controller_rx_ma: f64,
    pub bluetooth_controller_tx_ma: f64,

    /// Draw while the cellular radio is actively transferring.
    pub radio_active_ma: f64,
    /// Draw while camped per signal strength bin, strongest first. A short
    /// table repeats its last entry for higher bins.
    pub radio_on_ma: Vec<f64>,
    pub radio_scanning_ma: f64,

    pub gps_on_ma: f64,
    pub camera_ma: f64,
    pub flashlight_ma: f64,

    /// Draw per sensor handle. GPS is priced via `gps_on_ma`, not here.
    pub sensors_ma: BTreeMap<i32, f64>,
}

impl PowerProfile {
    /// Parse a profile from JSON, sanitizing malformed entries.
    pub fn from_json_str(s: &str) -> Result<Self, ProfileError> {
        let mut profile: PowerProfile = serde_json::from_str(s)?;
        profile.sanitize();
        Ok(profile)
    }

    /// Load a profile document from disk.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Zero out entries a model cannot price: negative or non-finite
    /// draws. Each is logged and skipped, never fatal. Returns how many
    /// entries were dropped.
    pub fn sanitize(&mut self) -> usize {
        let mut dropped = 0;
        for (name, value) in self.scalar_entries_mut() {
            if !value.is_finite() || *value < 0.0 {
                warn!("power profile: dropping malformed constant {name} = {value}");
                *value = 0.0;
                dropped += 1;
            }
        }
        for (i, value) in self.cpu_active_ma.iter_mut().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                warn!("power profile: dropping malformed cpu step {i} = {value}");
                *value = 0.0;
                dropped += 1;
            }
        }
        for (i, value) in self.radio_on_ma.iter_mut().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                warn!("power profile: dropping malformed radio bin {i} = {value}");
                *value = 0.0;
                dropped += 1;
            }
        }
        for (handle, value) in self.sensors_ma.iter_mut() {
            if !value.is_finite() || *value < 0.0 {
                warn!("power profile: dropping malformed sensor {handle} = {value}");
                *value = 0.0;
                dropped += 1;
            }
        }
        dropped
    }

    /// Draw for one cpu speed step; steps beyond the table price at zero.
    pub fn cpu_step_ma(&self, step: usize) -> f64 {
        self.cpu_active_ma.get(step).copied().unwrap_or(0.0)
    }

    /// Number of cpu speed steps this profile prices.
    pub fn cpu_step_count(&self) -> usize {
        self.cpu_active_ma.len()
    }

    /// Camped-radio draw for a signal strength bin. A short table repeats
    /// its last entry; an empty table prices at zero.
    pub fn radio_on_ma(&self, bin: usize) -> f64 {
        match self.radio_on_ma.get(bin) {
            Some(v) => *v,
            None => self.radio_on_ma.last().copied().unwrap_or(0.0),
        }
    }

    /// Draw for one sensor handle, zero when unmapped.
    pub fn sensor_ma(&self, handle: i32) -> f64 {
        self.sensors_ma.get(&handle).copied().unwrap_or(0.0)
    }

    /// Whether wifi controller activity reporting can be trusted: all
    /// three controller coefficients must be present.
    pub fn has_wifi_controller_power(&self) -> bool {
        self.wifi_controller_idle_ma > 0.0
            && self.wifi_controller_rx_ma > 0.0
            && self.wifi_controller_tx_ma > 0.0
    }

    /// Whether bluetooth controller activity reporting can be trusted.
    pub fn has_bluetooth_controller_power(&self) -> bool {
        self.bluetooth_controller_idle_ma > 0.0
            && self.bluetooth_controller_rx_ma > 0.0
            && self.bluetooth_controller_tx_ma > 0.0
    }

    /// Named scalar constants, for reports and sanitization.
    pub fn named_constants(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("battery.capacity", self.battery_capacity_mah),
            ("cpu.idle", self.cpu_idle_ma),
            ("cpu.awake", self.cpu_awake_ma),
            ("screen.on", self.screen_on_ma),
            ("screen.full", self.screen_full_ma),
            ("wifi.on", self.wifi_on_ma),
            ("wifi.scan", self.wifi_scan_ma),
            ("wifi.controller.idle", self.wifi_controller_idle_ma),
            ("wifi.controller.rx", self.wifi_controller_rx_ma),
            ("wifi.controller.tx", self.wifi_controller_tx_ma),
            ("bluetooth.on", self.bluetooth_on_ma),
            ("bluetooth.controller.idle", self.bluetooth_controller_idle_ma),
            ("bluetooth.controller.rx", self.bluetooth_controller_rx_ma),
            ("bluetooth.controller.tx", self.bluetooth_controller_tx_ma),
            ("radio.active", self.radio_active_ma),
            ("radio.scanning", self.radio_scanning_ma),
            ("gps.on", self.gps_on_ma),
            ("camera.on", self.camera_ma),
            ("flashlight.on", self.flashlight_ma),
        ]
    }

    fn scalar_entries_mut(&mut self) -> [(&'static str, &mut f64); 19] {
        [
            ("battery.capacity", &mut self.battery_capacity_mah),
            ("cpu.idle", &mut self.cpu_idle_ma),
            ("cpu.awake", &mut self.cpu_awake_ma),
            ("screen.on", &mut self.screen_on_ma),
            ("screen.full", &mut self.screen_full_ma),
            ("wifi.on", &mut self.wifi_on_ma),
            ("wifi.scan", &mut self.wifi_scan_ma),
            ("wifi.controller.idle", &mut self.wifi_controller_idle_ma),
            ("wifi.controller.rx", &mut self.wifi_controller_rx_ma),
            ("wifi.controller.tx", &mut self.wifi_controller_tx_ma),
            ("bluetooth.on", &mut self.bluetooth_on_ma),
            ("bluetooth.controller.idle", &mut self.bluetooth_controller_idle_ma),
            ("bluetooth.controller.rx", &mut self.bluetooth_controller_rx_ma),
            ("bluetooth.controller.tx", &mut self.bluetooth_controller_tx_ma),
            ("radio.active", &mut self.radio_active_ma),
            ("radio.scanning", &mut self.radio_scanning_ma),
            ("gps.on", &mut self.gps_on_ma),
            ("camera.on", &mut self.camera_ma),
            ("flashlight.on", &mut self.flashlight_ma),
        ]
    }

    /// A plausible mid-range handset table for demos and tests.
    pub fn reference() -> Self {
        PowerProfile {
            battery_capacity_mah: 3000.0,
            cpu_idle_ma: 3.5,
            cpu_awake_ma: 40.0,
            cpu_active_ma: vec![60.0, 100.0, 140.0, 190.0, 250.0],
            screen_on_ma: 90.0,
            screen_full_ma: 280.0,
            wifi_on_ma: 2.0,
            wifi_scan_ma: 100.0,
            wifi_controller_idle_ma: 3.0,
            wifi_controller_rx_ma: 100.0,
            wifi_controller_tx_ma: 250.0,
            bluetooth_on_ma: 1.5,
            bluetooth_controller_idle_ma: 2.0,
            bluetooth_controller_rx_ma: 50.0,
            bluetooth_controller_tx_ma: 80.0,
            radio_active_ma: 180.0,
            radio_on_ma: vec![25.0, 20.0, 16.0, 12.0, 10.0],
            radio_scanning_ma: 95.0,
            gps_on_ma: 50.0,
            camera_ma: 940.0,
            flashlight_ma: 160.0,
            sensors_ma: BTreeMap::from([(1, 0.8), (4, 2.3), (8, 0.4)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_as_unsupported() {
        let profile = PowerProfile::from_json_str(r#"{"battery_capacity_mah": 2800}"#).unwrap();
        assert_eq!(profile.battery_capacity_mah, 2800.0);
        assert_eq!(profile.screen_on_ma, 0.0);
        assert!(!profile.has_wifi_controller_power());
        assert!(!profile.has_bluetooth_controller_power());
    }

    #[test]
    fn sanitize_drops_negative_and_nonfinite() {
        let mut profile = PowerProfile::reference();
        profile.screen_on_ma = -12.0;
        profile.cpu_active_ma[2] = f64::NAN;
        profile.sensors_ma.insert(9, f64::INFINITY);
        let dropped = profile.sanitize();
        assert_eq!(dropped, 3);
        assert_eq!(profile.screen_on_ma, 0.0);
        assert_eq!(profile.cpu_active_ma[2], 0.0);
        assert_eq!(profile.sensor_ma(9), 0.0);
    }

    #[test]
    fn controller_capability_needs_all_three_constants() {
        let mut profile = PowerProfile::reference();
        assert!(profile.has_wifi_controller_power());
        profile.wifi_controller_tx_ma = 0.0;
        assert!(!profile.has_wifi_controller_power());
    }

    #[test]
    fn radio_bin_table_repeats_last_entry() {
        let profile = PowerProfile::reference();
        assert_eq!(profile.radio_on_ma(0), 25.0);
        assert_eq!(profile.radio_on_ma(4), 10.0);
        assert_eq!(profile.radio_on_ma(17), 10.0);

        let empty = PowerProfile::default();
        assert_eq!(empty.radio_on_ma(0), 0.0);
    }

    #[test]
    fn cpu_steps_beyond_table_price_at_zero() {
        let profile = PowerProfile::reference();
        assert_eq!(profile.cpu_step_ma(0), 60.0);
        assert_eq!(profile.cpu_step_ma(5), 0.0);
    }

    #[test]
    fn round_trips_through_json() {
        let profile = PowerProfile::reference();
        let json = serde_json::to_string_pretty(&profile).unwrap();
        let back = PowerProfile::from_json_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
