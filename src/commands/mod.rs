// src/commands/mod.rs
pub mod check;
pub mod constants;
pub mod symbols;
pub mod version;

use helperlib_runtime::alloc_track;

/// Print host objects still alive. Returns `true` when none are, or when
/// tracking is off.
pub fn report_live_objects() -> bool {
    if !alloc_track::is_enabled() {
        return true;
    }
    let live = alloc_track::report();
    if live.is_empty() {
        return true;
    }
    eprintln!("error: host objects still alive on exit:");
    for (kind, count) in live {
        eprintln!("  {:<16} {count}", kind.name());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_report_without_tracking() {
        assert!(!alloc_track::is_enabled());
        assert!(report_live_objects());
    }
}
