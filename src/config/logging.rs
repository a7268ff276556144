use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt, EnvFilter };

const DEFAULT_FILTER: &str = "info,diesel=warn,redis=warn";

/// Initializes the operational console.
///
/// This is where the service reports on itself: startup, sink connection attempts, and
/// every log record the durable sink had to drop. Request-level business events do not
/// go through here; they go through [`crate::logger::AppLogger`].
///
/// The filter is read from `RUST_LOG`. When it is not set (or invalid) the fallback is
/// `info` for the application with `diesel` and `redis` turned down to `warn`.
///
/// Call once, at the start of `main`. A second call is ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    // try_init so tests and embedders that already installed a subscriber keep theirs
    let _ = tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).try_init();
}
