use tracing::level_filters::LevelFilter;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

/// Installs a fmt subscriber as the global default, unless one is already set.
pub(crate) fn install(level: LevelFilter) {
    if level == LevelFilter::OFF {
        return;
    }

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!(%level, "global subscriber already set, keeping it");
    }
}
