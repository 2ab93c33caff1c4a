use log::{debug, info, warn};
use std::fmt::Display;
use std::sync::Once;
use std::time::Instant;

static INIT: Once = Once::new();
static TRACING_INIT: Once = Once::new();

/// Initialize the logging system.
///
/// `RUST_LOG` still wins; later calls are no-ops.
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .filter_module("erp_migrate", log::LevelFilter::Debug)
            .filter_module("reqwest", log::LevelFilter::Warn) // HTTP noise
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("governor", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .format_target(false)
            .try_init();

        info!("Migration logging initialized");
    });
}

/// Install a fmt subscriber for the `tracing` events emitted by the cache layer
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .try_init();
    });
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

/// Log lines shared by the migration components, so one grep finds every
/// record transition or destination call of a run.
pub struct MigrationLog;

impl MigrationLog {
    /// Record moved between lifecycle states
    pub fn transition(record: &dyn Display, from: &dyn Display, to: &dyn Display) {
        debug!("Record: {} {} -> {}", record, from, to);
    }

    /// One HTTP exchange with the destination
    pub fn destination_call(method: &str, url: &str, status: Option<u16>, duration_ms: u64) {
        match status {
            Some(status) if status < 400 => {
                debug!("Destination: {} {} -> {} in {}ms", method, url, status, duration_ms)
            }
            Some(status) => warn!(
                "Destination: {} {} -> {} in {}ms",
                method, url, status, duration_ms
            ),
            None => warn!(
                "Destination: {} {} failed after {}ms",
                method, url, duration_ms
            ),
        }
    }

    /// Batch totals at the end of `migrate_batch`
    pub fn batch_summary(
        run_id: &dyn Display,
        succeeded: usize,
        processing: usize,
        failed: usize,
        warnings: usize,
    ) {
        info!(
            "Run {}: {} succeeded, {} processing, {} failed, {} warnings",
            run_id, succeeded, processing, failed, warnings
        );
    }

    pub fn performance_metric(operation: &str, duration_ms: u64, extra: Option<&str>) {
        match extra {
            Some(extra) => info!("Performance: {} took {}ms ({})", operation, duration_ms, extra),
            None => debug!("Performance: {} took {}ms", operation, duration_ms),
        }
    }
}

/// Wall-clock timing for one operation
pub struct TimedOperation {
    start: Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn finish(self) -> u64 {
        let duration = self.elapsed_ms();
        MigrationLog::performance_metric(&self.operation, duration, None);
        duration
    }

    pub fn finish_with_info(self, extra: &str) -> u64 {
        let duration = self.elapsed_ms();
        MigrationLog::performance_metric(&self.operation, duration, Some(extra));
        duration
    }
}
