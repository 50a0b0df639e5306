// src/commands/version.rs

use std::process::ExitCode;

use helperlib_runtime::helper_symbols;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEBUG: &str = env!("VERGEN_CARGO_DEBUG");
const TARGET_TRIPLE: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");
const BUILD_DATE: &str = env!("VERGEN_BUILD_DATE");

fn make_version_string() -> String {
    let profile = if DEBUG == "true" { "debug" } else { "release" };
    format!("{VERSION} ({profile} {TARGET_TRIPLE}, built {BUILD_DATE})")
}

pub fn version_string() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(make_version_string)
}

pub fn print_version() -> ExitCode {
    println!("helperlib {}", version_string());
    println!("helpers: {}", helper_symbols().count());
    ExitCode::SUCCESS
}
