//! Live reconfiguration example
//!
//! Demonstrates subtree updates that change one setting while every logger
//! keeps its own overrides, and the `log` facade bridge.
//!
//! Run with: cargo run --example live_reconfiguration

use rust_json_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust JSON Logger - Live Reconfiguration Example ===\n");

    // the (scope, change) pairs a configuration source would deliver at startup
    let registry = LoggerRegistry::builder()
        .updates([
            ConfigUpdate::new("db", |config: &Config| {
                config.with_fields([LogField::Level, LogField::Message, LogField::Logger])
            }),
            ConfigUpdate::level("http", LogLevel::Debug),
        ])
        .build()?;
    rust_json_logger::facade::init(registry.clone())?;

    let query = registry.get_logger("db.query");
    let router = registry.get_logger("http.router");

    println!("1. Startup configuration:");
    query.info("query planner ready");
    router.debug("routes compiled");

    println!("\n2. Raising the whole tree to WARN; db keeps its short field list:");
    registry.set_level("", LogLevel::Warn)?;
    query.info("hidden");
    query.warn("slow query detected");
    router.warn("route table reloaded");
    for name in registry.logger_names() {
        if let Some(config) = registry.config_of(&name) {
            println!("   {:<12} level={:?} fields={}", name, config.level, config.fields.len());
        }
    }

    println!("\n3. Turning a subtree off from a string setting:");
    registry.set_level_str("http", "off")?;
    router.error("hidden");
    if let Err(e) = registry.set_level_str("http", "loud") {
        println!("   rejected update: {}", e);
    }

    println!("\n4. Records from the log facade:");
    registry.set_level("my_app", LogLevel::Info)?;
    log::info!(target: "my_app::jobs", "nightly job scheduled");
    log::debug!(target: "my_app::jobs", "hidden");

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
