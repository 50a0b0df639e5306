// crates/helperlib-runtime/src/export_table.rs
//! Helper export table: name -> address map handed to the code generator.
//!
//! [`CORE_SYMBOLS`] and the math list in `arith` are the single source of
//! truth for what is exported. The table is built once on first use and is
//! read-only afterwards; a build that fails leaves no table at all.

use std::ffi::c_long;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::buffer::BUFFER_VIEW_SIZE;
use crate::errors::InitError;
use crate::{adaptor, arith, buffer, record, rounding};

/// One exported helper.
#[derive(Debug, Clone, Copy)]
pub struct HelperSymbol {
    pub name: &'static str,
    pub ptr: *const u8,
}

pub const CORE_SYMBOLS: &[HelperSymbol] = &[
    HelperSymbol {
        name: "sdiv",
        ptr: arith::helperlib_sdiv as *const u8,
    },
    HelperSymbol {
        name: "srem",
        ptr: arith::helperlib_srem as *const u8,
    },
    HelperSymbol {
        name: "udiv",
        ptr: arith::helperlib_udiv as *const u8,
    },
    HelperSymbol {
        name: "urem",
        ptr: arith::helperlib_urem as *const u8,
    },
    HelperSymbol {
        name: "cpow",
        ptr: arith::helperlib_cpow as *const u8,
    },
    HelperSymbol {
        name: "complex_adaptor",
        ptr: adaptor::helperlib_complex_adaptor as *const u8,
    },
    HelperSymbol {
        name: "extract_record_data",
        ptr: buffer::helperlib_extract_record_data as *const u8,
    },
    HelperSymbol {
        name: "release_record_buffer",
        ptr: buffer::helperlib_release_record_buffer as *const u8,
    },
    HelperSymbol {
        name: "recreate_record",
        ptr: record::helperlib_recreate_record as *const u8,
    },
    HelperSymbol {
        name: "round_even",
        ptr: rounding::helperlib_round_even as *const u8,
    },
    HelperSymbol {
        name: "roundf_even",
        ptr: rounding::helperlib_roundf_even as *const u8,
    },
    HelperSymbol {
        name: "fptoui",
        ptr: rounding::helperlib_fptoui as *const u8,
    },
];

/// Every exported helper, core first.
pub fn helper_symbols() -> impl Iterator<Item = &'static HelperSymbol> {
    CORE_SYMBOLS.iter().chain(arith::math_symbols())
}

/// Address of a helper, stored as an integer so the table can be shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperAddr(usize);

impl HelperAddr {
    pub fn get(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *const u8 {
        self.0 as *const u8
    }
}

#[derive(Debug, Clone)]
pub struct ExportTable {
    entries: FxHashMap<&'static str, HelperAddr>,
}

impl ExportTable {
    /// Build a table from a symbol list. Fails on the first duplicate name or
    /// null address, in which case nothing is returned.
    pub fn from_symbols<'a>(
        symbols: impl IntoIterator<Item = &'a HelperSymbol>,
    ) -> Result<ExportTable, InitError> {
        let mut entries = FxHashMap::default();
        for symbol in symbols {
            if symbol.ptr.is_null() {
                return Err(InitError::NullAddress(symbol.name));
            }
            if entries
                .insert(symbol.name, HelperAddr(symbol.ptr as usize))
                .is_some()
            {
                return Err(InitError::DuplicateSymbol(symbol.name));
            }
        }
        Ok(ExportTable { entries })
    }

    pub fn get(&self, name: &str) -> Option<HelperAddr> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, HelperAddr)> + '_ {
        self.entries.iter().map(|(&name, &addr)| (name, addr))
    }

    /// Entries ordered by name.
    pub fn sorted(&self) -> Vec<(&'static str, HelperAddr)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|&(name, _)| name);
        entries
    }
}

static EXPORT_TABLE: OnceLock<Result<ExportTable, InitError>> = OnceLock::new();

/// The process-wide export table, built on first call.
pub fn export_table() -> Result<&'static ExportTable, InitError> {
    EXPORT_TABLE
        .get_or_init(|| {
            let built = ExportTable::from_symbols(helper_symbols());
            match &built {
                Ok(table) => tracing::debug!(helpers = table.len(), "export table built"),
                Err(err) => tracing::warn!(%err, "export table build failed"),
            }
            built
        })
        .as_ref()
        .map_err(Clone::clone)
}

pub const LONG_MIN: c_long = c_long::MIN;
pub const LONG_MAX: c_long = c_long::MAX;

/// What the host sees after loading the helper module.
#[derive(Debug, Clone, Copy)]
pub struct HelperModule {
    pub c_helpers: &'static ExportTable,
    /// Bytes generated code must reserve for a `BufferView`.
    pub buffer_view_size: usize,
    pub long_min: c_long,
    pub long_max: c_long,
}

/// Module initialisation. Fails, exposing nothing, if the table cannot be
/// built.
pub fn module_init() -> Result<HelperModule, InitError> {
    let c_helpers = export_table()?;
    Ok(HelperModule {
        c_helpers,
        buffer_view_size: BUFFER_VIEW_SIZE,
        long_min: LONG_MIN,
        long_max: LONG_MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn helper_names_are_unique() {
        let mut seen = FxHashSet::default();
        for symbol in helper_symbols() {
            assert!(
                seen.insert(symbol.name),
                "duplicate helper name in export list: {}",
                symbol.name
            );
        }
    }

    #[test]
    fn helper_addresses_are_non_null() {
        for symbol in helper_symbols() {
            assert!(!symbol.ptr.is_null(), "{} has a null address", symbol.name);
        }
    }

    #[test]
    fn table_has_every_helper() {
        let table = export_table().unwrap();
        assert_eq!(table.len(), helper_symbols().count());
        for name in [
            "sdiv",
            "srem",
            "udiv",
            "urem",
            "cpow",
            "complex_adaptor",
            "extract_record_data",
            "release_record_buffer",
            "recreate_record",
            "round_even",
            "roundf_even",
            "fptoui",
            "sqrt",
            "sqrtf",
            "fmodf",
            "copysign",
        ] {
            assert!(table.get(name).is_some(), "{name} missing");
        }
        assert!(table.get("nonexistent").is_none());
    }

    #[test]
    fn addresses_match_functions() {
        let table = export_table().unwrap();
        let addr = table.get("round_even").unwrap();
        assert_eq!(addr.as_ptr(), rounding::helperlib_round_even as *const u8);
    }

    #[test]
    fn duplicate_fails_whole_table() {
        let symbols = [CORE_SYMBOLS[0], CORE_SYMBOLS[1], CORE_SYMBOLS[0]];
        let err = ExportTable::from_symbols(&symbols).unwrap_err();
        assert_eq!(err, InitError::DuplicateSymbol("sdiv"));
    }

    #[test]
    fn null_address_fails_whole_table() {
        let symbols = [
            CORE_SYMBOLS[0],
            HelperSymbol {
                name: "broken",
                ptr: std::ptr::null(),
            },
        ];
        let err = ExportTable::from_symbols(&symbols).unwrap_err();
        assert_eq!(err, InitError::NullAddress("broken"));
    }

    #[test]
    fn sorted_is_ordered() {
        let sorted = export_table().unwrap().sorted();
        assert!(sorted.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn module_constants() {
        let module = module_init().unwrap();
        assert_eq!(module.buffer_view_size, size_of::<crate::buffer::BufferView>());
        assert_eq!(module.long_min, c_long::MIN);
        assert_eq!(module.long_max, c_long::MAX);
        assert!(std::ptr::eq(module.c_helpers, export_table().unwrap()));
    }
}
