//! Stress tests for concurrent use of one registry
//!
//! These tests verify:
//! - Concurrent lookups of the same name converge on one node
//! - Subtree updates reach loggers created while the update runs
//! - Records from many threads stay whole
//! - The shared stack trace filter under contention

use rust_json_logger::core::stack_trace_filter::{DEFAULT_CAPACITY, DEFAULT_FALSE_POSITIVE_RATE};
use rust_json_logger::core::{BloomFilter, Fingerprint};
use rust_json_logger::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn discard_registry() -> LoggerRegistry {
    LoggerRegistry::builder()
        .backend(SinkBackend::Discard)
        .build()
        .expect("Failed to build registry")
}

#[test]
fn test_concurrent_get_logger_creates_one_node() {
    let registry = discard_registry();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..200)
                    .map(|_| registry.get_logger("race.for.this.node"))
                    .last()
                    .unwrap()
            })
        })
        .collect();

    let loggers: Vec<Logger> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for logger in &loggers[1..] {
        assert!(logger.same_node(&loggers[0]));
    }
    // root, race, race.for, race.for.this, race.for.this.node
    assert_eq!(registry.node_count(), 5);
}

#[test]
fn test_update_reaches_loggers_created_concurrently() {
    let registry = discard_registry();
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..100 {
                    registry.get_logger(&format!("stress.t{}.leaf{}", t, i));
                }
            })
        })
        .collect();

    barrier.wait();
    registry.set_level("stress", LogLevel::Error).unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let names = registry.logger_names();
    assert_eq!(names.len(), 1 + THREADS + THREADS * 100);
    for name in names {
        assert_eq!(
            registry.config_of(&name).unwrap().level,
            Some(LogLevel::Error),
            "{} missed the update",
            name
        );
    }
}

#[test]
fn test_concurrent_updates_keep_per_node_overrides() {
    let registry = discard_registry();
    let fields = [LogField::Message];
    for i in 0..20 {
        registry
            .update_config(&format!("app.m{}", i), |config| config.with_fields(fields))
            .unwrap();
    }

    let handles: Vec<_> = LogLevel::ALL
        .iter()
        .map(|&level| {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    registry.set_level("app", level).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let level = registry.config_of("app").unwrap().level;
    for i in 0..20 {
        let config = registry.config_of(&format!("app.m{}", i)).unwrap();
        assert_eq!(config.fields, fields.to_vec());
        // updates are serialized, so the whole subtree ends on one level
        assert_eq!(config.level, level);
    }
}

#[test]
fn test_concurrent_logging_keeps_records_whole() {
    let (target, buffer) = SinkTarget::memory();
    let registry = LoggerRegistry::builder().target(target).build().unwrap();
    let per_thread = 500;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                let logger = registry.get_logger(&format!("worker.{}", t));
                let _worker = Mdc::scoped("worker", t.to_string());
                for i in 0..per_thread {
                    logger
                        .at_info()
                        .add_argument(i)
                        .add_key_value("thread", t as u64)
                        .log("item {} processed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = buffer.lines();
    assert_eq!(lines.len(), THREADS * per_thread);
    for line in &lines {
        let record: serde_json::Value = serde_json::from_str(line).expect("Interleaved record");
        let t = record["data"]["thread"].as_u64().unwrap();
        assert_eq!(record["logger"], format!("worker.{}", t));
        assert_eq!(record["mdc"]["worker"], t.to_string());
    }
    assert_eq!(
        registry.metrics().records_written(),
        (THREADS * per_thread) as u64
    );
    assert_eq!(registry.metrics().write_failures(), 0);
}

#[test]
fn test_logging_while_levels_change() {
    let registry = discard_registry();
    let logger = registry.get_logger("flapping.component");

    let writers: Vec<_> = (0..THREADS)
        .map(|_| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..2_000 {
                    logger.at_info().add_argument(i).log("tick {}");
                }
            })
        })
        .collect();

    for i in 0..200 {
        let level = if i % 2 == 0 { LogLevel::Error } else { LogLevel::Trace };
        registry.set_level("flapping", level).unwrap();
    }
    for writer in writers {
        writer.join().unwrap();
    }

    let written = registry.metrics().records_written();
    assert!(written <= (THREADS * 2_000) as u64);
    assert_eq!(registry.metrics().write_failures(), 0);
    assert_eq!(registry.metrics().pool_violations(), 0);
}

#[test]
fn test_concurrent_filter_marks_are_never_lost() {
    let filter = Arc::new(BloomFilter::with_capacity(
        DEFAULT_CAPACITY,
        DEFAULT_FALSE_POSITIVE_RATE,
    ));
    let per_thread = DEFAULT_CAPACITY / THREADS;

    let frames = |t: usize, i: usize| {
        [StackFrame::new(
            format!("stress.T{}", t),
            "run",
            Some("stress.rs"),
            Some(i as u32 + 1),
        )]
    };

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let filter = Arc::clone(&filter);
            thread::spawn(move || {
                for i in 0..per_thread {
                    filter.check_and_mark(&Fingerprint::of_frames(&frames(t, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..THREADS {
        for i in 0..per_thread {
            assert!(filter.check(&Fingerprint::of_frames(&frames(t, i))));
        }
    }
}

#[test]
fn test_concurrent_deduplication_bounds_full_traces() {
    let (target, buffer) = SinkTarget::memory();
    let registry = LoggerRegistry::builder()
        .target(target)
        .deduplicate_stack_traces(true)
        .build()
        .unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));
    let per_thread = 50;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let logger = registry.get_logger("retry.loop");
                let failure = Throwable::new("Timeout").with_frames([
                    StackFrame::new("retry.Loop", "attempt", Some("retry.rs"), Some(10)),
                    StackFrame::new("retry.Loop", "run", Some("retry.rs"), Some(4)),
                ]);
                barrier.wait();
                for _ in 0..per_thread {
                    logger.at_error().set_cause(failure.clone()).log("attempt failed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let lines = buffer.lines();
    let total = THREADS * per_thread;
    assert_eq!(lines.len(), total);

    let full = lines
        .iter()
        .filter(|line| {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            record["throwable"]["stacktrace"].is_array()
        })
        .count();

    // a thread marks the shape once its own full record is written, so it
    // writes at most one full trace itself
    assert!(!registry.stack_trace_filter().is_pass_through());
    assert!(full >= 1);
    assert!(full <= THREADS, "{} full traces", full);
    assert_eq!(registry.metrics().traces_elided() as usize, total - full);
}

#[test]
fn test_registries_on_one_thread_use_their_own_targets() {
    let (first_target, first) = SinkTarget::memory();
    let (second_target, second) = SinkTarget::memory();
    let a = LoggerRegistry::builder().target(first_target).build().unwrap();
    let b = LoggerRegistry::builder().target(second_target).build().unwrap();

    for i in 0..10 {
        a.get_logger("a").at_info().add_argument(i).log("a {}");
        b.get_logger("b").at_info().add_argument(i).log("b {}");
    }

    assert_eq!(first.lines().len(), 10);
    assert_eq!(second.lines().len(), 10);
    assert!(first.lines().iter().all(|line| line.contains("\"logger\":\"a\"")));
    assert!(second.lines().iter().all(|line| line.contains("\"logger\":\"b\"")));
}
