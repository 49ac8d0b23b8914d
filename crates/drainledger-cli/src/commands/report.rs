use drainledger_core::{
    DrainEngine, EngineConfig, JsonFileProvider, Ledger, RefreshRequest, format_mah,
};

pub struct ReportCommandConfig<'a> {
    pub snapshot_path: &'a str,
    pub profile_path: Option<&'a str>,
    pub period: &'a str,
    pub users: &'a [u32],
    pub all_users: bool,
    pub min_pct: u32,
    pub wifi_only: bool,
    pub json: bool,
}

pub fn run(cfg: ReportCommandConfig<'_>) {
    let profile = super::load_profile(cfg.profile_path);
    let engine_config = EngineConfig {
        min_discharge_pct_for_reconcile: cfg.min_pct,
        wifi_only: cfg.wifi_only,
    };
    let mut engine = DrainEngine::with_config(
        profile,
        JsonFileProvider::new(cfg.snapshot_path),
        engine_config,
    );

    let request = RefreshRequest {
        period: super::parse_period(cfg.period),
        user_filter: super::user_filter(cfg.users, cfg.all_users),
        anchors: None,
    };

    let ledger = match engine.refresh(&request) {
        Ok(ledger) => ledger,
        Err(err) => {
            eprintln!("Attribution failed: {err}");
            std::process::exit(1);
        }
    };

    if ledger.consumers.is_empty() && ledger.stats_period_us() == 0 {
        eprintln!("No snapshot data at {}; nothing to attribute.", cfg.snapshot_path);
    }

    if cfg.json {
        match serde_json::to_string_pretty(ledger) {
            Ok(doc) => println!("{doc}"),
            Err(err) => {
                eprintln!("Failed to serialize ledger: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    print_table(ledger);
}

fn print_table(ledger: &Ledger) {
    println!(
        "⚡ Battery drain {} over {} ({} consumers)\n",
        ledger.period,
        super::format_duration(ledger.stats_period_us()),
        ledger.consumers.len()
    );

    println!("{:<28} {:>12} {:>7}", "Consumer", "mAh", "Share");
    println!("{}", "-".repeat(49));
    for record in &ledger.consumers {
        let total = record.total_power_mah();
        let share = if ledger.total_power_mah > 0.0 {
            100.0 * total / ledger.total_power_mah
        } else {
            0.0
        };
        println!(
            "  {:<26} {:>12} {:>6.1}%",
            super::consumer_name(record),
            format_mah(total),
            share
        );
    }
    println!("{}", "=".repeat(49));

    println!(
        "  Computed draw:  {} mAh   Published total: {} mAh",
        format_mah(ledger.computed_power_mah),
        format_mah(ledger.total_power_mah)
    );
    println!(
        "  Measured drain: {} .. {} mAh",
        format_mah(ledger.min_drained_power_mah),
        format_mah(ledger.max_drained_power_mah)
    );
    if let Some(us) = ledger.battery_time_remaining_us() {
        println!("  Battery time remaining: {}", super::format_duration(us));
    }
    if let Some(us) = ledger.charge_time_remaining_us() {
        println!("  Charge time remaining:  {}", super::format_duration(us));
    }
}
