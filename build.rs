use std::{env, process::Command};

fn main() {
    emit_build_info();
}

/// Expose build metadata to `src/build_info.rs` as compile-time env vars
fn emit_build_info() {
    let timestamp = chrono::Utc::now().format("%Y%m%d.%H%M%S").to_string();
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", timestamp);

    let git_hash = git_commit().unwrap_or_else(|| "unknown".to_string());
    let short: String = git_hash.chars().take(7).collect();
    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=GIT_HASH_SHORT={}", short);

    let cfg = |key: &str| env::var(key).unwrap_or_else(|_| "unknown".to_string());
    println!(
        "cargo:rustc-env=TARGET_PLATFORM={}-{}",
        cfg("CARGO_CFG_TARGET_ARCH"),
        cfg("CARGO_CFG_TARGET_OS")
    );
    println!("cargo:rustc-env=BUILD_PROFILE={}", cfg("PROFILE"));

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}

fn git_commit() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}
