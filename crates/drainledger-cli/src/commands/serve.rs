use drainledger_core::EngineConfig;

pub fn run(
    snapshot_path: &str,
    profile_path: Option<&str>,
    host: &str,
    port: u16,
    min_pct: u32,
    wifi_only: bool,
) {
    let profile = super::load_profile(profile_path);
    let engine_config = EngineConfig {
        min_discharge_pct_for_reconcile: min_pct,
        wifi_only,
    };
    let engine = drainledger_server::server_engine(profile, snapshot_path, engine_config);

    let base = format!("http://{host}:{port}");

    println!("⚡ drainledger server v{}", drainledger_core::VERSION);
    println!("   {base}");
    println!("   snapshot: {snapshot_path}");
    println!();
    println!("   Endpoints:");
    println!("     GET  /                 API index (try: curl {base})");
    println!("     GET  /api/ledger       Full ranked ledger for the period");
    println!("     GET  /api/summary      Reconciliation scalars only");
    println!("     GET  /api/signaling    Apps ranked by radio signaling overhead");
    println!("     GET  /api/health       Engine state and snapshot availability");
    println!("     POST /api/invalidate   Re-read the snapshot file on next refresh");
    println!();
    println!("   Query params for /api/ledger, /api/summary, /api/signaling:");
    println!("     period=boot|unplugged|charged   Accounting period (default: charged)");
    println!("     users=0,10|all                  Users ranked individually (default: 0)");
    println!();
    println!("   Examples:");
    println!("     curl {base}/api/ledger?period=unplugged");
    println!("     curl {base}/api/summary");
    println!("     curl \"{base}/api/ledger?users=all\"");
    println!("     curl -X POST {base}/api/invalidate");
    println!();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(drainledger_server::run_server(engine, host, port));
}
