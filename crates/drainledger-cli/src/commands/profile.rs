pub fn run(path: Option<&str>) {
    let profile = super::load_profile(path);
    let source = path.unwrap_or("<built-in reference table>");

    println!("🔋 Power profile: {source}\n");
    println!("  Battery capacity:     {:.0} mAh", profile.battery_capacity_mah);
    println!("  CPU speed steps:      {}", profile.cpu_step_count());
    println!("  Radio signal bins:    {}", profile.radio_on_ma.len());
    println!("  Mapped sensors:       {}", profile.sensors_ma.len());
    println!(
        "  Wifi controller:      {}",
        yes_no(profile.has_wifi_controller_power())
    );
    println!(
        "  Bluetooth controller: {}",
        yes_no(profile.has_bluetooth_controller_power())
    );
    println!();

    println!("{:<26} {:>10}", "Constant", "Value");
    println!("{}", "-".repeat(37));
    for (name, value) in profile.named_constants() {
        println!("  {name:<24} {value:>10.2}");
    }
    for (step, value) in profile.cpu_active_ma.iter().enumerate() {
        println!("  cpu.active.{step:<13} {value:>10.2}");
    }
    for (bin, value) in profile.radio_on_ma.iter().enumerate() {
        println!("  radio.on.{bin:<15} {value:>10.2}");
    }
    for (handle, value) in &profile.sensors_ma {
        println!("  sensor.{handle:<17} {value:>10.2}");
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}
