pub mod builders;
pub mod fake_gates;
pub mod probes;

use std::sync::Once;

use forge::logging::{build_filter, LOG_ENV};
use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// Uses the same `FORGE_LOG` directives as the binary, e.g.
/// `FORGE_LOG=forge::gate=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = build_filter(None, std::env::var(LOG_ENV).ok().as_deref());

        // Output only shows for failing tests unless --nocapture.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
