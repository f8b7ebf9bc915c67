use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "countdown_render=info,countdown=info";
const VERBOSE_FILTER: &str = "countdown_render=debug,countdown=debug,info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Logs go to stderr so `check` output on stdout stays machine-readable.
pub fn init_logger(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    // try_init: a second call (tests, embedding) leaves the first subscriber in place.
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer.compact()).try_init()
    };
}
