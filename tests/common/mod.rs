#![allow(dead_code)]

pub use dirbuild_test_utils::builders::{ConfigBuilder, StaticProbe, mock_tree};
pub use dirbuild_test_utils::fake_toolchain::FakeToolchain;
pub use dirbuild_test_utils::{build_mock, build_mock_with_probe, init_tracing, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use dirbuild::fs::mock::MockFileSystem;

/// Mock tree plus a fake toolchain writing into it.
pub fn fixture(sources: &[&str]) -> (MockFileSystem, Arc<FakeToolchain>) {
    init_tracing();
    let fs = mock_tree(sources);
    let toolchain = Arc::new(FakeToolchain::new(&fs));
    (fs, toolchain)
}

/// `appA/main.c` -> `./src/appA/main.c`
pub fn src(rel: &str) -> PathBuf {
    PathBuf::from(format!("./src/{rel}"))
}
