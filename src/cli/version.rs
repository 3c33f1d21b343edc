//! `parachute version`

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "unknown";

/// Source revision, injected at build time through `PARACHUTE_REVISION`
pub fn revision() -> &'static str {
    option_env!("PARACHUTE_REVISION").unwrap_or(UNKNOWN)
}

/// Build date, injected at build time through `PARACHUTE_BUILD_DATE`
pub fn build_date() -> &'static str {
    option_env!("PARACHUTE_BUILD_DATE").unwrap_or(UNKNOWN)
}

pub fn version_info() -> String {
    format!(
        "Version: {}\nRevision: {}\nBuild Date: {}",
        VERSION,
        revision(),
        build_date()
    )
}

/// Handle the version command
pub fn handle_version_command() {
    println!("{}", version_info());
}
