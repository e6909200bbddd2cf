use crate::config::LoggingSection;
use tracing::Level;

/// Installs the global fmt subscriber. Later calls are ignored.
pub fn init_tracing(logging: &LoggingSection) {
    let level = parse_level(&logging.level);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::debug!(%level, "Tracing initialised");
    }
}

fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}
