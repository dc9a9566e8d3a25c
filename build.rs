use std::process::Command;

fn main() {
    // An explicit build id from the environment wins over git metadata
    if let Ok(id) = std::env::var("PRECACHE_BUILD_ID") {
        if !id.trim().is_empty() {
            println!("cargo:rustc-env=PRECACHE_BUILD_ID={}", id.trim());
            println!("cargo:rerun-if-env-changed=PRECACHE_BUILD_ID");
            return;
        }
    }

    if let Some(id) = git_tag().or_else(date_hash) {
        println!("cargo:rustc-env=PRECACHE_BUILD_ID={}", id);
    }

    println!("cargo:rerun-if-env-changed=PRECACHE_BUILD_ID");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn git_tag() -> Option<String> {
    run("git", &["describe", "--exact-match", "--tags", "HEAD"])
}

fn date_hash() -> Option<String> {
    let date = run("date", &["+%Y%m%d"])?;
    let hash = run("git", &["rev-parse", "--short", "HEAD"])?;
    Some(format!("{}-{}", date, hash))
}
