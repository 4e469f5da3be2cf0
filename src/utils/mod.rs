use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber.
///
/// `directives` is a comma-separated filter such as `fintrack=info`; `RUST_LOG`
/// directives are applied first and these are added on top. Only the first
/// call has any effect.
pub fn init_tracing(directives: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        let mut rejected = Vec::new();
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse::<Directive>() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => rejected.push(directive.to_string()),
            }
        }

        // A subscriber installed by the host wins.
        let _ = fmt().with_env_filter(filter).try_init();

        if !rejected.is_empty() {
            tracing::warn!(?rejected, "ignored invalid log filter directives");
        }
    });
}
