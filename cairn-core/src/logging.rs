//! Logger bootstrap built on the standard `log` facade.
//!
//! Connection threads and the deploy path all log through `log::*` macros;
//! this module wires `env_logger` behind them. Binaries call [`init`] once
//! at startup; library users may install any other `log` backend instead.

/// Initialize the process-wide logger.
///
/// Reads `RUST_LOG`, defaulting to `info` when unset. Safe to call more
/// than once; later calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init();
}

/// Logger for tests: quiet by default, honors `RUST_LOG` when set.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}
