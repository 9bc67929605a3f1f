//! File logging example
//!
//! Demonstrates appending JSON records to a file and repeated exceptions
//! being elided by stack trace deduplication.
//!
//! Run with: cargo run --example file_logging

use rust_json_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Rust JSON Logger - File Logging Example ===\n");

    let registry = LoggerRegistry::builder()
        .target_file("application.log")
        .deduplicate_stack_traces(true)
        .build()?;
    let logger = registry.get_logger("app.startup");

    println!("1. Logging to application.log:");
    logger.info("Application started");
    logger.debug("Loading configuration... (below INFO, not written)");
    logger.info("Configuration loaded successfully");
    logger.warn("Using default settings for some options");

    println!("2. Logging a retry loop with identical failures:");
    let failure = Throwable::new("ConnectionRefused")
        .with_message("database at localhost:5432 refused the connection")
        .with_frames([
            StackFrame::new("db.Pool", "connect", Some("pool.rs"), Some(120)),
            StackFrame::new("db.Pool", "get", Some("pool.rs"), Some(64)),
            StackFrame::new("app.Startup", "run", Some("main.rs"), Some(18)),
        ]);
    for attempt in 1..=3 {
        logger
            .at_error()
            .add_argument(attempt)
            .set_cause(failure.clone())
            .log("connection attempt {} failed");
    }
    logger.info("Application initialization complete");

    let metrics = registry.metrics();
    println!("\n3. Metrics:");
    println!("   records written: {}", metrics.records_written());
    println!("   traces elided:   {}", metrics.traces_elided());
    println!("   write failures:  {}", metrics.write_failures());

    println!("\n✓ Logs written to: application.log");
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
