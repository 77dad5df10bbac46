//! The one typed error this crate exposes (spec §7: "the core does not
//! convert internal predicates into user-visible errors ... All other
//! conditions are either infallible or fatal"). Shaped like
//! `std::collections::TryReserveError`, which every fallible-reservation
//! path in this crate's teacher's dependency tree (and `std` itself) settles
//! on rather than pulling in an error-formatting crate for a two-variant enum.

use std::alloc::Layout;
use std::fmt;

/// Returned by `try_reserve`/`try_insert`-style paths when growing the table
/// would fail. Every other operation is infallible and aborts the process on
/// allocation failure instead, matching spec §7.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TryReserveError {
    kind: TryReserveErrorKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum TryReserveErrorKind {
    CapacityOverflow,
    AllocError { layout: Layout },
}

impl TryReserveError {
    #[inline]
    pub(crate) fn capacity_overflow() -> Self {
        TryReserveError {
            kind: TryReserveErrorKind::CapacityOverflow,
        }
    }

    #[inline]
    pub(crate) fn alloc_error(layout: Layout) -> Self {
        TryReserveError {
            kind: TryReserveErrorKind::AllocError { layout },
        }
    }
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TryReserveErrorKind::CapacityOverflow => {
                write!(f, "the requested capacity exceeds the maximum supported")
            }
            TryReserveErrorKind::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl std::error::Error for TryReserveError {}
