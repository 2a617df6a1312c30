pub mod api;
pub mod core;
pub mod frame_extractor;

/// Installs `env_logger` (default level `info`, overridable via `RUST_LOG`).
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
