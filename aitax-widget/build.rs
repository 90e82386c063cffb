//! Build identification for the `aitax` binary
//!
//! Sets `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` for the startup
//! log line and `--version`. Source tarballs carry no `.git`, so packagers
//! may supply the revision through `AITAX_GIT_HASH`; `SOURCE_DATE_EPOCH`
//! pins the timestamp for reproducible builds.

use chrono::{DateTime, SecondsFormat, Utc};
use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Run git and return trimmed stdout on success
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Short commit hash, suffixed `-dirty` for uncommitted changes
fn source_revision() -> String {
    if let Some(hash) = std::env::var("AITAX_GIT_HASH")
        .ok()
        .filter(|h| !h.trim().is_empty())
    {
        return hash.trim().to_string();
    }

    let Some(hash) = git(&["rev-parse", "--short=8", "HEAD"]) else {
        return UNKNOWN.to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

fn build_timestamp() -> String {
    let pinned = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    pinned
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn main() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string());

    println!("cargo:rustc-env=GIT_HASH={}", source_revision());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp());
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
