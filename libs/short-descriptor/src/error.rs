// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::arch::Arch;
use crate::table::TableKind;

#[derive(Debug, onlyerror::Error)]
pub enum Error {
    /// The selected architecture has no attribute table or memory map.
    #[error("translation tables for {arch} are not implemented")]
    Unimplemented { arch: Arch },
    /// A record would land at or below the previous record of the same table.
    #[error(
        "{table} entry {index:#06x} is not above the previous entry {previous:#06x}, regions must be ascending and non-overlapping"
    )]
    OutOfOrder {
        table: TableKind,
        index: u16,
        previous: u16,
    },
    /// A record index lies beyond the last slot of the table.
    #[error("{table} entry {index:#x} is out of range")]
    IndexOutOfRange { table: TableKind, index: u32 },
    /// A page was requested before any 1 MB block was routed to the second level table.
    #[error("page at {address:#010x} has no second level table, define a translation entry first")]
    NoSecondLevelTable { address: u32 },
    /// A page lies outside of the 1 MB block of the current second level table.
    #[error("page at {address:#010x} is outside the translated block at {region:#010x}")]
    OutsideTranslatedRegion { address: u32, region: u32 },
    /// Writing the generated text failed.
    #[error("failed to format translation table")]
    Format(#[from] core::fmt::Error),
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error:expr) => {
        if !$cond {
            return Err($error);
        }
    };
}
