use std::env;
use std::process::Command;

fn main() {
    // Release pipelines stamp a build number through the environment; local
    // builds report 0.
    let build_number = env::var("TRIZIP_BUILD_NUMBER")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    let profile_label = if profile == "release" { "release" } else { "development" };

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=TRIZIP_VERSION={}", version);
    println!("cargo:rustc-env=TRIZIP_BUILD={}", build_number);
    println!("cargo:rustc-env=TRIZIP_PROFILE={}", profile_label);
    println!("cargo:rustc-env=TRIZIP_GIT_HASH={}", git_hash);

    println!("cargo:rerun-if-env-changed=TRIZIP_BUILD_NUMBER");
    println!("cargo:rerun-if-env-changed=PROFILE");
}
