//! Build script: embeds the git hash and checks for ALSA headers when the
//! `mic` feature pulls in cpal.

use std::process::Command;

fn main() {
    // Embed git short hash for version string
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "mic") && cfg!(target_os = "linux") {
        check_alsa();
    }
}

fn check_alsa() {
    let found = Command::new("pkg-config")
        .args(["--exists", "alsa"])
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    if !found {
        println!("cargo::warning=ALSA development files not found (pkg-config alsa).");
        println!("cargo::warning=The `mic` feature needs them to build cpal:");
        println!("cargo::warning=  Debian/Ubuntu: sudo apt install libasound2-dev");
        println!("cargo::warning=  Fedora:        sudo dnf install alsa-lib-devel");
    }
}
