// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::attributes::AttributeSet;
use crate::emit::AsmSyntax;
use crate::memory_map::MemoryMap;
use crate::{Error, Result};

/// The architecture tables are generated for, selected once at startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// AArch32 short-descriptor tables in ARM assembler syntax.
    #[default]
    Arch32,
    /// AArch64 tables in GNU assembler syntax.
    ///
    /// There is neither an attribute table nor a memory map for this architecture yet, all
    /// operations needing one fail with [`Error::Unimplemented`].
    Arch64,
}

impl Arch {
    pub const fn syntax(self) -> AsmSyntax {
        match self {
            Arch::Arch32 => AsmSyntax::ARMASM,
            Arch::Arch64 => AsmSyntax::GNU,
        }
    }

    /// Returns the memory attribute encodings of this architecture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unimplemented`] for [`Arch::Arch64`].
    pub fn attributes(self) -> Result<AttributeSet> {
        match self {
            Arch::Arch32 => Ok(AttributeSet::short_descriptor()),
            Arch::Arch64 => Err(Error::Unimplemented { arch: self }),
        }
    }

    /// Returns the built-in platform memory map of this architecture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unimplemented`] for [`Arch::Arch64`].
    pub fn memory_map(self) -> Result<MemoryMap> {
        match self {
            Arch::Arch32 => Ok(MemoryMap::aarch32()),
            Arch::Arch64 => Err(Error::Unimplemented { arch: self }),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Arch32 => f.write_str("aarch32"),
            Arch::Arch64 => f.write_str("aarch64"),
        }
    }
}
