//! Basic attribution example.
//!
//! Builds a small synthetic usage snapshot, runs one refresh cycle, and
//! prints the ranked ledger.
//!
//! Run: `cargo run --example basic`

use drainledger_core::{
    AccountingPeriod, DrainEngine, PowerProfile, RefreshRequest, Scoped, StaticProvider, Uid,
    UidUsage, UsageSnapshot, format_mah,
};

fn main() {
    // An hour on battery: a browser holding wakelocks and a navigation app
    // running the camera, with the screen on half the time.
    let snapshot = UsageSnapshot {
        captured_realtime_us: 3_600_000_000,
        captured_uptime_us: 3_600_000_000,
        battery_realtime_us: Scoped::new(3_600_000_000),
        battery_uptime_us: Scoped::new(3_600_000_000),
        screen_on_time_us: Scoped::new(1_800_000_000),
        discharge_lower_pct: 4,
        discharge_upper_pct: 5,
        uids: vec![
            UidUsage {
                uid: Uid(10_001),
                label: Some("browser".into()),
                wakelock_partial_time_us: Scoped::new(900_000_000),
                ..Default::default()
            },
            UidUsage {
                uid: Uid(10_002),
                label: Some("navigation".into()),
                camera_time_us: Scoped::new(300_000_000),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let mut engine = DrainEngine::new(PowerProfile::reference(), StaticProvider::new(snapshot));
    let request = RefreshRequest::new(AccountingPeriod::SinceCharged);
    let ledger = match engine.refresh(&request) {
        Ok(ledger) => ledger,
        Err(err) => {
            eprintln!("refresh failed: {err}");
            return;
        }
    };

    println!("Battery attribution, {}:", ledger.period);
    for record in &ledger.consumers {
        let owner = match (&record.label, record.uid) {
            (Some(label), _) => label.clone(),
            (None, Some(uid)) => format!("uid {}", uid.0),
            (None, None) => record.kind.to_string(),
        };
        println!(
            "  {owner:<16} {:>10} mAh",
            format_mah(record.total_power_mah())
        );
    }
    println!(
        "\nModeled {} mAh against a measured {}..{} mAh envelope",
        format_mah(ledger.computed_power_mah),
        format_mah(ledger.min_drained_power_mah),
        format_mah(ledger.max_drained_power_mah),
    );
    println!("Published total: {} mAh", format_mah(ledger.total_power_mah));
}
