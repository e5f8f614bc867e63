//! Test support: one global tracing subscriber for all tests.
//!
//! Output goes through the libtest writer, so it only shows for failing
//! tests or with `--nocapture`. `RUST_LOG` overrides the default
//! `posegraph=trace`.

use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        install_subscriber();
        info!("test logging ready");
    });
}

fn install_subscriber() {
    if tracing::dispatcher::has_been_set() {
        debug!("tracing subscriber already installed");
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("posegraph=trace"));
    let layer = fmt::layer()
        .with_test_writer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter);

    if let Err(e) = tracing_subscriber::registry().with(layer).try_init() {
        eprintln!("Error: Failed to set up logging: {}", e);
    }
}
