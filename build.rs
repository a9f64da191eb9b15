use std::process::Command;

fn main() {
    let git_hash = stdout_of("git", &["rev-parse", "--short", "HEAD"]);
    let build_date = stdout_of("date", &["-u", "+%Y-%m-%d"]);

    println!("cargo:rustc-env=POLLBOT_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=POLLBOT_BUILD_DATE={}", build_date);
    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Trimmed stdout of a successful command, or "unknown".
fn stdout_of(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
