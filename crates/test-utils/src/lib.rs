pub mod builders;
pub mod fake_toolchain;

use std::sync::{Arc, Once};

use dirbuild::config::BuildConfig;
use dirbuild::fs::FileSystem;
use dirbuild::fs::mock::MockFileSystem;
use dirbuild::probe::CapabilityProbe;
use dirbuild::report::BuildReport;
use dirbuild::{BuildOptions, build_project};
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{ConfigBuilder, StaticProbe, mock_tree};
pub use fake_toolchain::FakeToolchain;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
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

/// One full `build` of a mock tree through the real engine and a fake toolchain.
pub async fn build_mock(
    fs: &MockFileSystem,
    config: &BuildConfig,
    toolchain: &Arc<FakeToolchain>,
) -> BuildReport {
    build_mock_with_probe(fs, config, toolchain, &StaticProbe::default()).await
}

/// Like [`build_mock`], answering capability queries from `probe`.
pub async fn build_mock_with_probe(
    fs: &MockFileSystem,
    config: &BuildConfig,
    toolchain: &Arc<FakeToolchain>,
    probe: &dyn CapabilityProbe,
) -> BuildReport {
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    with_timeout(build_project(
        config,
        shared,
        Arc::clone(toolchain),
        probe,
        BuildOptions::default(),
    ))
    .await
    .expect("build should not hit a fatal error")
}
