use std::process::Command;

/// `git describe` output for the footer, or "dev" outside a checkout.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    let build = describe().unwrap_or_else(|| "dev".to_string());
    println!("cargo:rustc-env=DUTY_LOG_BUILD={build}");
}
