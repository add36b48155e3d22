//! Embeds the workspace `VERSION` file as `FACEGATE_VERSION`.

use std::fs;
use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let version_path = Path::new(&manifest_dir).join("../../VERSION");
    println!("cargo:rerun-if-changed={}", version_path.display());

    let version = fs::read_to_string(&version_path)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_path.display()))
        .trim()
        .to_string();

    let well_formed = version.split('.').count() == 3
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    assert!(well_formed, "VERSION must be MAJOR.MINOR.PATCH, got {version:?}");

    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    if package_version != version {
        println!("cargo:warning=VERSION ({version}) differs from package version ({package_version})");
    }

    println!("cargo:rustc-env=FACEGATE_VERSION={version}");
}
