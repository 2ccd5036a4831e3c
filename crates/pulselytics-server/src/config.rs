/// Re-export `Config` from `pulselytics-core` for use within this crate.
///
/// All environment-variable parsing lives in `pulselytics-core` so it can be
/// shared with integration tests without depending on the full server.
pub use pulselytics_core::config::Config;
