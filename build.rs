//! Build script embedding the source revision for run logs

use std::process::Command;

fn main() {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output();

    let git_hash = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => std::env::var("SENTINEL_BUILD_REV").unwrap_or_else(|_| String::from("unknown")),
    };

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-env-changed=SENTINEL_BUILD_REV");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
