/// Build-time git commit SHA stamped by build.rs when available.
pub fn git_sha() -> Option<&'static str> {
    option_env!("MUPORT_BUILD_GIT_SHA")
}

/// Long version string for the CLI, carrying the commit SHA when the
/// build had one.
pub fn long_version() -> String {
    match git_sha() {
        Some(sha) => format!("{} ({sha})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}
