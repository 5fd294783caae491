//! Stamps the proxy build with the version and time reported by `/version`.

use std::process::Command;

/// `git describe` of the checkout, or the crate version outside a repository.
fn proxy_version() -> String {
    Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn main() {
    for watched in ["../.git/HEAD", "../.git/refs/tags"] {
        println!("cargo:rerun-if-changed={}", watched);
    }

    println!("cargo:rustc-env=GIT_VERSION={}", proxy_version());
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
}
