// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

use crate::attributes::Granularity;
use crate::{Error, Result, ensure};

/// The number of slots in a logical translation table.
pub const TABLE_ENTRIES: u16 = 4096;
/// The number of 4 KiB pages that make up a single 1 MiB section.
pub const PAGES_PER_SECTION: u16 = 256;
/// The size in bytes of one second-level table (256 word-sized descriptors).
pub const SECOND_LEVEL_TABLE_SIZE: u32 = 0x400;

/// Low bit of a first-level descriptor marking it as a pointer to a second-level table.
const PAGE_TABLE_DESCRIPTOR: u32 = 1;

const SECTION_SHIFT: u32 = 20;
const PAGE_SHIFT: u32 = 12;
const SECTION_MASK: u32 = 0xFFF0_0000;
const SUPERSECTION_MASK: u32 = 0xFF00_0000;
/// The number of first-level slots a single supersection occupies.
const SECTIONS_PER_SUPERSECTION: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The first-level table, one slot per 1 MiB.
    Ttb,
    /// The second-level table, one slot per 4 KiB within translated 1 MiB blocks.
    Slttb,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Ttb => f.write_str("TTB"),
            TableKind::Slttb => f.write_str("SLTTB"),
        }
    }
}

/// One populated slot of a logical translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    /// Position of the slot within the 4096 entry table.
    pub index: u16,
    /// The fully encoded descriptor word.
    pub value: u32,
    /// Label shared by all records of one memory region.
    pub tag: String,
    /// The address this record was derived from.
    pub address: u32,
}

/// An append-only, strictly ascending sequence of [`TableRecord`]s.
#[derive(Debug, Clone)]
pub struct Table {
    kind: TableKind,
    records: Vec<TableRecord>,
}

impl Table {
    pub const fn new(kind: TableKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    pub const fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` does not fit the table and
    /// [`Error::OutOfOrder`] if it is not strictly above the index of the previously appended
    /// record.
    fn push(&mut self, index: u32, value: u32, tag: &str, address: u32) -> Result<()> {
        let index = u16::try_from(index)
            .ok()
            .filter(|index| *index < TABLE_ENTRIES)
            .ok_or(Error::IndexOutOfRange {
                table: self.kind,
                index,
            })?;

        if let Some(previous) = self.records.last() {
            ensure!(
                index > previous.index,
                Error::OutOfOrder {
                    table: self.kind,
                    index,
                    previous: previous.index,
                }
            );
        }

        log::trace!(
            "{} [{index:#06x}] = {value:#010x} ({address:#010x} {tag:?})",
            self.kind
        );

        self.records.push(TableRecord {
            index,
            value,
            tag: tag.to_string(),
            address,
        });

        Ok(())
    }
}

/// The second-level table window opened by the most recent translation entry.
#[derive(Debug, Clone, Copy)]
struct Window {
    /// SLTTB index of the first page of the window.
    base: u32,
    /// The 1 MiB block the window translates.
    region: u32,
}

/// Builds the first- and second-level tables from a sequence of region descriptions.
///
/// Regions must be supplied in ascending address order and must not overlap, every operation
/// rejects records that would violate this.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    ttb_base: u32,
    slttb_base: u32,
    ttb: Table,
    slttb: Table,
    /// Address of the next second-level table handed out by [`Self::translation_entry`].
    next_table: u32,
    /// SLTTB index at which the next second-level table starts.
    next_window: u32,
    window: Option<Window>,
}

impl TableBuilder {
    pub const fn new(ttb_base: u32, slttb_base: u32) -> Self {
        Self {
            ttb_base,
            slttb_base,
            ttb: Table::new(TableKind::Ttb),
            slttb: Table::new(TableKind::Slttb),
            next_table: slttb_base,
            next_window: 0,
            window: None,
        }
    }

    pub const fn ttb_base(&self) -> u32 {
        self.ttb_base
    }

    pub const fn slttb_base(&self) -> u32 {
        self.slttb_base
    }

    pub const fn ttb(&self) -> &Table {
        &self.ttb
    }

    pub const fn slttb(&self) -> &Table {
        &self.slttb
    }

    /// Routes the 1 MiB block containing `address` through a fresh second-level table.
    ///
    /// Must be called once per subdivided block, before the [`Self::page_entry`] calls for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the first-level record is out of order, or if the second-level table
    /// has no room for another 256 pages.
    pub fn translation_entry(&mut self, address: u32, tag: &str) -> Result<()> {
        ensure!(
            self.next_window < u32::from(TABLE_ENTRIES),
            Error::IndexOutOfRange {
                table: TableKind::Slttb,
                index: self.next_window,
            }
        );

        let index = address >> SECTION_SHIFT;
        let value = self.next_table.wrapping_add(PAGE_TABLE_DESCRIPTOR);
        self.ttb.push(index, value, tag, address)?;

        self.window = Some(Window {
            base: self.next_window,
            region: address & SECTION_MASK,
        });
        self.next_table = self.next_table.wrapping_add(SECOND_LEVEL_TABLE_SIZE);
        self.next_window += u32::from(PAGES_PER_SECTION);

        Ok(())
    }

    /// Maps `count` consecutive 4 KiB pages starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if no translation entry precedes this call, if a page falls outside the
    /// translated 1 MiB block, or if the pages are out of order.
    pub fn page_entry(
        &mut self,
        address: u32,
        count: u32,
        attributes: u32,
        tag: &str,
    ) -> Result<()> {
        let window = self.window.ok_or(Error::NoSecondLevelTable { address })?;

        let mut address = address;
        for _ in 0..count {
            ensure!(
                address & SECTION_MASK == window.region,
                Error::OutsideTranslatedRegion {
                    address,
                    region: window.region,
                }
            );

            let page = (address >> PAGE_SHIFT) & u32::from(PAGES_PER_SECTION - 1);
            let value = (page << 24) | attributes;
            self.slttb.push(window.base + page, value, tag, address)?;

            address = address.wrapping_add(Granularity::Page.block_size());
        }

        Ok(())
    }

    /// Maps `count` consecutive 1 MiB sections starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sections are out of order with respect to earlier first-level
    /// records.
    pub fn section_entry(
        &mut self,
        address: u32,
        count: u32,
        attributes: u32,
        tag: &str,
    ) -> Result<()> {
        let mut address = address;
        for _ in 0..count {
            let index = address >> SECTION_SHIFT;
            let value = (address & SECTION_MASK) | attributes;
            self.ttb.push(index, value, tag, address)?;

            address = address.wrapping_add(Granularity::Section.block_size());
        }

        Ok(())
    }

    /// Maps `count` consecutive 16 MiB supersections starting at `address`.
    ///
    /// Each supersection fills 16 consecutive first-level slots with identical records.
    ///
    /// # Errors
    ///
    /// Returns an error if the supersections are out of order with respect to earlier first-level
    /// records or spill past the last slot of the table.
    pub fn supersection_entry(
        &mut self,
        address: u32,
        count: u32,
        attributes: u32,
        tag: &str,
    ) -> Result<()> {
        let mut address = address;
        for _ in 0..count {
            let index = address >> SECTION_SHIFT;
            let value = (address & SUPERSECTION_MASK) | attributes;
            for slot in 0..SECTIONS_PER_SUPERSECTION {
                self.ttb.push(index + slot, value, tag, address)?;
            }

            address = address.wrapping_add(Granularity::Supersection.block_size());
        }

        Ok(())
    }
}
