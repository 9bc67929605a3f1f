//! Basic logger usage example
//!
//! Demonstrates hierarchical loggers, levels, arguments, markers and
//! key-value pairs with the JSON and console backends.
//!
//! Run with: cargo run --example basic_usage

use rust_json_logger::prelude::*;
use rust_json_logger::{info, warn};

fn main() -> Result<()> {
    println!("=== Rust JSON Logger - Basic Usage Example ===\n");

    // JSON lines on stdout
    let registry = LoggerRegistry::builder().level(LogLevel::Debug).build()?;
    let orders = registry.get_logger("service.orders");

    println!("1. Logging at different levels (TRACE is below the configured DEBUG):");
    orders.trace("This is a trace message (hidden)");
    orders.debug("This is a debug message");
    orders.info("This is an info message");
    orders.warn("This is a warning message");
    orders.error("This is an error message");

    println!("\n2. Arguments, markers and key-value pairs:");
    orders
        .at_info()
        .add_argument(42)
        .add_argument("alice")
        .add_marker("AUDIT")
        .add_key_value("amount", 99.95)
        .add_key_value("currency", "EUR")
        .log("order {} placed by {}");

    info!(orders, "{} items in stock", 17);
    warn!(orders, "stock for {} is low", "widgets");

    println!("\n3. Changing the level of a subtree:");
    registry.set_level("service", LogLevel::Warn)?;
    orders.info("Info message (hidden)");
    orders.warn("Warning message (visible)");

    println!("\n4. Human-readable console output:");
    let console = LoggerRegistry::builder()
        .backend(SinkBackend::Console)
        .target(SinkTarget::Stdout)
        .build()?;
    let payments = console.get_logger("service.payments");
    let _request = Mdc::scoped("request_id", "r-1001");
    payments.info("payment authorised");
    payments
        .at_error()
        .set_cause(
            Throwable::new("GatewayTimeout")
                .with_message("no answer in 30s")
                .with_frame(StackFrame::new("payments.Gateway", "charge", Some("gateway.rs"), Some(77))),
        )
        .log("payment failed");

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
