// src/commands/symbols.rs

use std::process::ExitCode;

use helperlib_runtime::{ExportTable, HelperAddr, export_table};

/// Table entries matching `filter`, ordered by name.
pub fn matching_symbols(
    table: &ExportTable,
    filter: Option<&str>,
) -> Vec<(&'static str, HelperAddr)> {
    table
        .sorted()
        .into_iter()
        .filter(|(name, _)| filter.is_none_or(|f| name.contains(f)))
        .collect()
}

pub fn list_symbols(filter: Option<&str>) -> ExitCode {
    let table = match export_table() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let entries = matching_symbols(table, filter);
    for (name, addr) in &entries {
        println!("{name:<24} {:#018x}", addr.get());
    }
    println!("{} of {} helpers", entries.len(), table.len());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_narrows_and_sorts() {
        let table = export_table().unwrap();
        let names: Vec<_> = matching_symbols(table, Some("round"))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["round_even", "roundf_even"]);
        assert_eq!(matching_symbols(table, None).len(), table.len());
    }
}
