// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Synthesis of static ARMv8 short-descriptor translation tables.
//!
//! A [`MemoryMap`] describes a platform's physical layout as an ordered list of regions. Building
//! it yields a [`TableBuilder`] holding the first-level (`TTB`) and second-level (`SLTTB`) tables,
//! which [`write_tables`] renders as run-length compacted assembler data directives ready to be
//! linked into a boot image.

pub mod arch;
pub mod attributes;
pub mod emit;
mod error;
pub mod memory_map;
pub mod table;

use core::fmt::Write;

pub use arch::Arch;
pub use attributes::{AttributeSet, Granularity, MemoryPolicy};
pub use emit::{AsmSyntax, Emitter, Line};
pub use error::Error;
pub use memory_map::{MemoryMap, Region};
pub use table::{Table, TableBuilder, TableKind, TableRecord};

pub type Result<T> = core::result::Result<T, Error>;

pub const KIB: u32 = 1024;
pub const MIB: u32 = 1024 * KIB;

/// Renders both tables of `tables`, preceded by a generator banner.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_tables(tables: &TableBuilder, syntax: AsmSyntax, out: &mut impl Write) -> Result<()> {
    let c = syntax.comment;

    writeln!(
        out,
        "{c} These tables are generated by mmu-gen {}, do not edit",
        env!("CARGO_PKG_VERSION")
    )?;

    writeln!(out, "{c} Level 1 table")?;
    writeln!(out, "TTB")?;
    emit::write_table(tables.ttb(), syntax, out)?;

    writeln!(out, "{c} Level 2 table")?;
    writeln!(out, "SLTTB")?;
    emit::write_table(tables.slttb(), syntax, out)?;

    Ok(())
}

/// Builds the tables for `arch` and renders them.
///
/// Uses `map` when given, otherwise the built-in memory map of `arch`.
///
/// # Errors
///
/// Returns [`Error::Unimplemented`] if `arch` has no attribute table (or no built-in map and none
/// was given), or any error reported while building the tables.
pub fn generate(arch: Arch, map: Option<&MemoryMap>) -> Result<String> {
    let attributes = arch.attributes()?;
    let tables = match map {
        Some(map) => map.build(&attributes)?,
        None => arch.memory_map()?.build(&attributes)?,
    };

    log::debug!(
        "built {} TTB records at {:#010x} and {} SLTTB records at {:#010x} for {arch}",
        tables.ttb().len(),
        tables.ttb_base(),
        tables.slttb().len(),
        tables.slttb_base(),
    );

    let mut out = String::new();
    write_tables(&tables, arch.syntax(), &mut out)?;
    Ok(out)
}
