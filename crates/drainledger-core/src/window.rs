//! Per-refresh snapshot window.
//!
//! Derived exactly once per cycle from the raw snapshot and the caller's
//! clock anchors: battery-on clocks, period-scoped device-wide durations,
//! and the measured discharge bounds everything reconciles against. After
//! derivation the rest of the cycle reads only this window, never the
//! snapshot's raw counters for device-wide data.

use serde::Serialize;

use crate::snapshot::{
    AccountingPeriod, ControllerActivity, NUM_BRIGHTNESS_BINS, NUM_SIGNAL_STRENGTH_BINS,
    UsageSnapshot,
};

/// The caller's "as-of" clock readings for a refresh, µs since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClockAnchors {
    pub realtime_us: u64,
    pub uptime_us: u64,
}

impl ClockAnchors {
    pub fn new(realtime_us: u64, uptime_us: u64) -> Self {
        ClockAnchors { realtime_us, uptime_us }
    }

    /// Anchors equal to the snapshot's capture instant, making the window
    /// a pure function of the snapshot alone.
    pub fn at_capture(snapshot: &UsageSnapshot) -> Self {
        ClockAnchors {
            realtime_us: snapshot.captured_realtime_us,
            uptime_us: snapshot.captured_uptime_us,
        }
    }
}

/// A radio controller's period-scoped activity, µs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerWindow {
    pub idle_time_us: u64,
    pub rx_time_us: u64,
    pub tx_time_us: u64,
}

impl ControllerWindow {
    fn scoped(activity: &ControllerActivity, period: AccountingPeriod) -> Self {
        ControllerWindow {
            idle_time_us: activity.idle_time_us.since(period),
            rx_time_us: activity.rx_time_us.since(period),
            tx_time_us: activity.tx_time_us.since(period),
        }
    }
}

/// Resolved per-cycle window. All durations µs, power bounds mAh.
///
/// Invariant: `type_battery_* <= battery_* <= raw_*` for both clocks; the
/// derivation clamps rather than trusting snapshot self-consistency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleWindow {
    pub period: AccountingPeriod,
    pub raw_realtime_us: u64,
    pub raw_uptime_us: u64,
    pub battery_realtime_us: u64,
    pub battery_uptime_us: u64,
    pub type_battery_realtime_us: u64,
    pub type_battery_uptime_us: u64,

    /// Empirical lower bound on discharge this period, mAh.
    pub min_drained_mah: f64,
    /// Empirical upper bound on discharge this period, mAh.
    pub max_drained_mah: f64,
    /// Low bound of the state-of-charge drop, percent. Gate input for
    /// reconciliation.
    pub discharge_lower_pct: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_time_remaining_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_time_remaining_us: Option<u64>,

    pub screen_on_time_us: u64,
    pub screen_brightness_time_us: [u64; NUM_BRIGHTNESS_BINS],
    pub phone_on_time_us: u64,
    pub phone_signal_strength_time_us: [u64; NUM_SIGNAL_STRENGTH_BINS],
    pub phone_signal_scanning_time_us: u64,
    pub mobile_radio_active_time_us: u64,
    pub mobile_rx_packets: u64,
    pub mobile_tx_packets: u64,
    pub global_wifi_running_time_us: u64,
    pub bluetooth_on_time_us: u64,
    pub wifi_controller: ControllerWindow,
    pub bluetooth_controller: ControllerWindow,
}

impl CycleWindow {
    /// The zero-valued window published when no snapshot exists yet.
    pub fn zero(period: AccountingPeriod) -> Self {
        CycleWindow { period, ..Default::default() }
    }

    /// Resolve a window from `snapshot` as of `anchors`, scoped to
    /// `period`. `capacity_mah` converts the state-of-charge drop into the
    /// discharge bounds.
    pub fn derive(
        snapshot: &UsageSnapshot,
        anchors: ClockAnchors,
        period: AccountingPeriod,
        capacity_mah: f64,
    ) -> Self {
        let battery_realtime =
            snapshot.battery_realtime_at(anchors.realtime_us).min(anchors.realtime_us);
        let battery_uptime = snapshot.battery_uptime_at(anchors.uptime_us).min(anchors.uptime_us);
        let type_realtime = snapshot
            .scoped_battery_realtime_at(anchors.realtime_us, period)
            .min(battery_realtime);
        let type_uptime =
            snapshot.scoped_battery_uptime_at(anchors.uptime_us, period).min(battery_uptime);

        let mut brightness = [0u64; NUM_BRIGHTNESS_BINS];
        for (bin, out) in brightness.iter_mut().enumerate() {
            *out = snapshot.screen_brightness_time_us[bin].since(period);
        }
        let mut signal = [0u64; NUM_SIGNAL_STRENGTH_BINS];
        for (bin, out) in signal.iter_mut().enumerate() {
            *out = snapshot.phone_signal_strength_time_us[bin].since(period);
        }

        CycleWindow {
            period,
            raw_realtime_us: anchors.realtime_us,
            raw_uptime_us: anchors.uptime_us,
            battery_realtime_us: battery_realtime,
            battery_uptime_us: battery_uptime,
            type_battery_realtime_us: type_realtime,
            type_battery_uptime_us: type_uptime,
            min_drained_mah: snapshot.discharge_lower_pct as f64 * capacity_mah / 100.0,
            max_drained_mah: snapshot.discharge_upper_pct as f64 * capacity_mah / 100.0,
            discharge_lower_pct: snapshot.discharge_lower_pct,
            battery_time_remaining_us: snapshot.battery_time_remaining_us,
            charge_time_remaining_us: snapshot.charge_time_remaining_us,
            screen_on_time_us: snapshot.screen_on_time_us.since(period),
            screen_brightness_time_us: brightness,
            phone_on_time_us: snapshot.phone_on_time_us.since(period),
            phone_signal_strength_time_us: signal,
            phone_signal_scanning_time_us: snapshot.phone_signal_scanning_time_us.since(period),
            mobile_radio_active_time_us: snapshot.mobile_radio_active_time_us.since(period),
            mobile_rx_packets: snapshot.mobile_rx_packets.since(period),
            mobile_tx_packets: snapshot.mobile_tx_packets.since(period),
            global_wifi_running_time_us: snapshot.global_wifi_running_time_us.since(period),
            bluetooth_on_time_us: snapshot.bluetooth_on_time_us.since(period),
            wifi_controller: ControllerWindow::scoped(&snapshot.wifi_controller, period),
            bluetooth_controller: ControllerWindow::scoped(&snapshot.bluetooth_controller, period),
        }
    }
}
