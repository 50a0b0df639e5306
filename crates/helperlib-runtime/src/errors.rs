// crates/helperlib-runtime/src/errors.rs
//! Helper error taxonomy and the host-visible pending-error slot.
//!
//! Rust callers get typed `Result`s. The C entry points cannot return a
//! `Result`, so on failure they return a sentinel (0 / null) and park the
//! error in a thread-local slot that the host drains with [`take_error`].

use std::cell::RefCell;

use thiserror::Error;

/// Failure converting a dynamic value to a native complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("value has no numeric coercion")]
    NotNumeric,
    #[error("array scalar has no resolvable element descriptor")]
    DescriptorUnavailable,
    #[error("array scalar could not be cast to double-precision complex")]
    CastFailed,
}

/// Failure extracting a raw buffer from an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("object has no `data` attribute")]
    NoDataAttribute,
    #[error("`data` attribute exposes no usable buffer protocol")]
    NoBufferProtocol,
}

/// Failure rebuilding a host record from raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("host runtime has no record kind")]
    RuntimeUnavailable,
    #[error("cannot build a record descriptor from the given type descriptor")]
    BadDescriptor,
    #[error("cannot materialise the byte region as a record array")]
    CopyFailed,
}

/// Failure assembling the export table. Fatal to module load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("helper `{0}` is registered twice")]
    DuplicateSymbol(&'static str),
    #[error("helper `{0}` has a null address")]
    NullAddress(&'static str),
}

/// Any error a helper can surface to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HelperError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
    #[error(transparent)]
    Init(#[from] InitError),
}

thread_local! {
    static PENDING_ERROR: RefCell<Option<HelperError>> = const { RefCell::new(None) };
}

/// Record a helper failure for the host to pick up. Replaces any error
/// still pending on this thread.
pub fn set_error(err: impl Into<HelperError>) {
    let err = err.into();
    tracing::debug!(%err, "helper failed");
    PENDING_ERROR.with(|slot| *slot.borrow_mut() = Some(err));
}

/// Take and clear the pending error of this thread.
pub fn take_error() -> Option<HelperError> {
    PENDING_ERROR.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_slot() {
        set_error(ExtractError::NoDataAttribute);
        assert_eq!(
            take_error(),
            Some(HelperError::Extract(ExtractError::NoDataAttribute))
        );
        assert_eq!(take_error(), None);
    }

    #[test]
    fn latest_error_wins() {
        set_error(ConversionError::NotNumeric);
        set_error(ReconstructError::CopyFailed);
        assert_eq!(
            take_error(),
            Some(HelperError::Reconstruct(ReconstructError::CopyFailed))
        );
    }

    #[test]
    fn slot_is_per_thread() {
        set_error(ConversionError::CastFailed);
        let other = std::thread::spawn(take_error).join().unwrap();
        assert_eq!(other, None);
        assert!(take_error().is_some());
    }

    #[test]
    fn messages_are_transparent() {
        let err: HelperError = InitError::DuplicateSymbol("sdiv").into();
        assert_eq!(err.to_string(), "helper `sdiv` is registered twice");
    }
}
