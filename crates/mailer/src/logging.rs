//! Tracing setup for the handler binary.
//!
//! The host reads the outcome line from stdout. The dispatcher also emits it
//! as a tracing event under [`OUTCOME_TARGET`]; the stderr log drops that
//! target so each attempt is reported once.

use tracing::{Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Target of the one-line outcome event emitted per dispatch attempt.
pub const OUTCOME_TARGET: &str = "mailer_mailgun::outcome";

pub fn is_outcome(metadata: &Metadata<'_>) -> bool {
    metadata.target() == OUTCOME_TARGET
}

/// Formatted log layer for everything except the outcome line.
pub fn log_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(writer)
        .with_filter(filter_fn(|metadata| !is_outcome(metadata)))
}

pub fn initialize_tracing() {
    let default_directives = "mailer_mailgun=info,hyper=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer(std::io::stderr))
        .init();
}
