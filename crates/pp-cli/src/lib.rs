//! Shared pieces of the `json2root` and `root2json` binaries.

pub mod json2root;
pub mod root2json;

pub use json2root::cmd_json2root;
pub use root2json::cmd_root2json;

/// Log level for a repeated `-v` count: 0 → WARN, 1 → INFO, 2 or more → DEBUG.
pub fn level_for(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    }
}

/// Install the stderr log subscriber.
pub fn init_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
