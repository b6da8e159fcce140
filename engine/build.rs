//! Embeds the source revision as `GIT_COMMIT_HASH` for the startup log line
//!
//! `TUNER_BUILD_COMMIT` wins when set (release pipelines build from tarballs
//! without a `.git`); otherwise `git describe` is asked; `unknown` is the
//! fallback.

use std::process::Command;

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    let revision = revision.trim();
    (!revision.is_empty()).then(|| revision.to_string())
}

fn main() {
    let revision = std::env::var("TUNER_BUILD_COMMIT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", revision);
    println!("cargo:rerun-if-env-changed=TUNER_BUILD_COMMIT");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
