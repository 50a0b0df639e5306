//! helperlib runtime: native helpers called by JIT-compiled code.
//!
//! Every `helperlib_*` function is `extern "C"` and addressed through the
//! export table. Helpers that take host objects are `unsafe`: callers must
//! pass null or live objects laid out per [`object`], and failures are
//! reported by sentinel return plus the thread-local pending error in
//! [`errors`]. No helper unwinds across the C boundary.
pub mod adaptor;
pub mod alloc_track;
pub mod arith;
pub mod buffer;
pub mod complex;
pub mod descriptor;
pub mod errors;
pub mod export_table;
pub mod host;
pub mod object;
pub mod record;
pub mod rounding;

pub use adaptor::{NumericKind, adapt_to_complex};
pub use buffer::{
    BUFFER_VIEW_SIZE, BufferGuard, BufferStrategy, BufferView, CurrentProtocol, LegacyProtocol,
    extract_buffer, extract_buffer_with, release_buffer,
};
pub use complex::NativeComplex;
pub use errors::{
    ConversionError, ExtractError, HelperError, InitError, ReconstructError, take_error,
};
pub use export_table::{
    ExportTable, HelperAddr, HelperModule, HelperSymbol, export_table, helper_symbols, module_init,
};
pub use object::{HostObject, HostRef, HostRuntime, HostType, ObjectKind, install_host_runtime};
pub use record::{reconstruct_record, reconstruct_record_with};
pub use rounding::{float_to_unsigned, round_half_even, roundf_half_even};
