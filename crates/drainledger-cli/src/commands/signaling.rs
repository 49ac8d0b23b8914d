use drainledger_core::{DrainEngine, JsonFileProvider, RefreshRequest};

pub fn run(snapshot_path: &str, profile_path: Option<&str>, period: &str) {
    let profile = super::load_profile(profile_path);
    let mut engine = DrainEngine::new(profile, JsonFileProvider::new(snapshot_path));

    let request = RefreshRequest::new(super::parse_period(period));
    let ledger = match engine.refresh(&request) {
        Ok(ledger) => ledger,
        Err(err) => {
            eprintln!("Attribution failed: {err}");
            std::process::exit(1);
        }
    };

    if ledger.signaling.is_empty() {
        println!("No application moved mobile packets in this window.");
        return;
    }

    println!(
        "📶 Mobile radio signaling overhead {} ({} apps)\n",
        ledger.period,
        ledger.signaling.len()
    );
    println!(
        "{:<28} {:>12} {:>10} {:>12}",
        "App", "ms/packet", "Packets", "Active"
    );
    println!("{}", "-".repeat(65));
    for record in &ledger.signaling {
        let packets = record.mobile_rx_packets + record.mobile_tx_packets;
        println!(
            "  {:<26} {:>12.1} {:>10} {:>12}",
            super::consumer_name(record),
            record.mobile_ms_per_packet.unwrap_or(0.0),
            packets,
            super::format_duration(record.mobile_active_time_ms * 1_000)
        );
    }
}
