// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Run-length compaction of a sparse [`Table`] into assembler data directives.
//!
//! The [`Emitter`] walks all [`TABLE_ENTRIES`] slots of a table in order. Populated slots are
//! collected into *data runs* of at most [`ENTRIES_PER_LINE`] values that share a tag, vacant
//! slots into *zero runs* that are chunked on [`ZERO_RUN_ALIGN`] boundaries. Only one run is ever
//! open: starting a run of the other kind, or a run that can't be extended, flushes the open run
//! as one [`Line`].

use core::fmt;
use core::fmt::Write;
use core::iter::Peekable;
use core::slice;

use crate::table::{TABLE_ENTRIES, Table, TableRecord};

/// The maximum number of values in a data run.
pub const ENTRIES_PER_LINE: u16 = 4;
/// Zero runs never cross a multiple of this index.
pub const ZERO_RUN_ALIGN: u16 = 16;
/// The value list is padded to this many columns before the comment is appended.
const VALUE_COLUMN_WIDTH: usize = 65;

/// The assembler dialect lines are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsmSyntax {
    /// The word-sized data directive.
    pub directive: &'static str,
    /// The line comment introducer.
    pub comment: &'static str,
}

impl AsmSyntax {
    /// ARM assembler (armasm) syntax.
    pub const ARMASM: Self = Self {
        directive: "DCD",
        comment: ";#",
    };
    /// GNU assembler syntax.
    pub const GNU: Self = Self {
        directive: "dcd",
        comment: "//",
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Values of populated slots sharing one tag.
    Data,
    /// Vacant slots.
    Zero,
}

/// The trailing comment of a [`Line`], any field may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment<'a> {
    pub index: Option<u16>,
    pub address: Option<u32>,
    pub tag: &'a str,
}

impl Comment<'_> {
    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.address.is_none() && self.tag.is_empty()
    }
}

impl fmt::Display for Comment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";

        if let Some(index) = self.index {
            write!(f, "{index:04X}")?;
            sep = " ";
        }
        if let Some(address) = self.address {
            write!(f, "{sep}0x{address:08X}")?;
            sep = " ";
        }
        if !self.tag.is_empty() {
            write!(f, "{sep}{}", self.tag)?;
        }

        Ok(())
    }
}

/// One flushed run: a single data directive in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub kind: RunKind,
    /// Index of the first slot covered by this line.
    pub start: u16,
    pub values: Vec<u32>,
    pub comment: Comment<'a>,
}

impl Line<'_> {
    /// The slots covered by this line.
    pub fn slots(&self) -> core::ops::Range<usize> {
        let start = usize::from(self.start);
        start..start + self.values.len()
    }

    /// Writes this line, terminated by a newline, in the given assembler `syntax`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render(&self, syntax: AsmSyntax, out: &mut impl Write) -> fmt::Result {
        let mut line = format!("        {}     ", syntax.directive);
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                line.push_str(", ");
            }
            if *value == 0 {
                line.push('0');
            } else {
                write!(line, "0x{value:08X}")?;
            }
        }

        if self.comment.is_empty() {
            writeln!(out, "{line}")
        } else {
            writeln!(
                out,
                "{line:<width$}{} {}",
                syntax.comment,
                self.comment,
                width = VALUE_COLUMN_WIDTH
            )
        }
    }
}

/// The run currently being accumulated.
#[derive(Debug)]
struct Run<'a> {
    kind: RunKind,
    start: u16,
    values: Vec<u32>,
    comment: Comment<'a>,
}

impl<'a> Run<'a> {
    fn data(record: &'a TableRecord) -> Self {
        Self {
            kind: RunKind::Data,
            start: record.index,
            values: vec![record.value],
            comment: Comment {
                index: Some(record.index),
                address: Some(record.address),
                tag: &record.tag,
            },
        }
    }

    fn zero(index: u16) -> Self {
        Self {
            kind: RunKind::Zero,
            start: index,
            values: vec![0],
            comment: Comment {
                index: index.is_multiple_of(ZERO_RUN_ALIGN).then_some(index),
                address: None,
                tag: "",
            },
        }
    }

    /// Whether `record` continues this run rather than starting a new one.
    ///
    /// The tag is compared before the line width, so a tag change always starts a new line.
    fn extends(&self, record: &TableRecord) -> bool {
        self.kind == RunKind::Data
            && self.comment.tag == record.tag
            && !(record.index - self.start).is_multiple_of(ENTRIES_PER_LINE)
    }

    /// Whether the vacant slot `index` continues this run.
    fn absorbs_zero(&self, index: u16) -> bool {
        self.kind == RunKind::Zero && !index.is_multiple_of(ZERO_RUN_ALIGN)
    }

    fn into_line(self) -> Line<'a> {
        Line {
            kind: self.kind,
            start: self.start,
            values: self.values,
            comment: self.comment,
        }
    }
}

/// Iterator over the [`Line`]s of a compacted table.
#[derive(Debug)]
pub struct Emitter<'a> {
    records: Peekable<slice::Iter<'a, TableRecord>>,
    /// The next slot to visit.
    index: u16,
    run: Option<Run<'a>>,
}

impl<'a> Emitter<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            records: table.records().iter().peekable(),
            index: 0,
            run: None,
        }
    }

    /// Feeds slot `index` into the open run, returning the run it replaced if it was flushed.
    fn visit(&mut self, index: u16) -> Option<Run<'a>> {
        if let Some(record) = self.records.next_if(|record| record.index == index) {
            if let Some(run) = self.run.as_mut().filter(|run| run.extends(record)) {
                run.values.push(record.value);
                return None;
            }

            return self.run.replace(Run::data(record));
        }

        if let Some(run) = self.run.as_mut().filter(|run| run.absorbs_zero(index)) {
            run.values.push(0);
            return None;
        }

        self.run.replace(Run::zero(index))
    }
}

impl<'a> Iterator for Emitter<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < TABLE_ENTRIES {
            let index = self.index;
            self.index += 1;

            if let Some(flushed) = self.visit(index) {
                log::trace!("flushing {:?} run at {:#06x}", flushed.kind, flushed.start);
                return Some(flushed.into_line());
            }
        }

        self.run.take().map(Run::into_line)
    }
}

/// Renders every line of `table` in the given assembler `syntax`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_table(table: &Table, syntax: AsmSyntax, out: &mut impl Write) -> fmt::Result {
    if table.is_empty() {
        log::warn!("{} has no entries, emitting an all-zero table", table.kind());
    }

    for line in Emitter::new(table) {
        line.render(syntax, out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::table::TableBuilder;

    const SECTION: u32 = 0x0001_100E;

    fn lines(table: &Table) -> Vec<Line<'_>> {
        Emitter::new(table).collect()
    }

    fn render(table: &Table) -> String {
        let mut out = String::new();
        write_table(table, AsmSyntax::ARMASM, &mut out).unwrap();
        out
    }

    #[test]
    fn empty_table_is_all_zero_chunks() {
        let table = Table::new(crate::table::TableKind::Ttb);
        let lines = lines(&table);

        assert_eq!(lines.len(), 256);
        for (n, line) in lines.iter().enumerate() {
            assert_eq!(line.kind, RunKind::Zero);
            assert_eq!(usize::from(line.start), n * 16);
            assert_eq!(line.values, [0; 16]);
            assert_eq!(line.comment.index, Some(line.start));
        }
    }

    #[test]
    fn five_sections_split_four_and_one() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder
            .section_entry(0x0400_0000, 5, SECTION, "CMNCFG")
            .unwrap();

        let lines = lines(builder.ttb());
        let data: Vec<_> = lines.iter().filter(|l| l.kind == RunKind::Data).collect();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].values.len(), 4);
        assert_eq!(data[1].values.len(), 1);
        assert_eq!(data[0].comment.tag, "CMNCFG");
        assert_eq!(data[1].comment.tag, "CMNCFG");
        assert_eq!(data[1].comment.address, Some(0x0440_0000));
    }

    #[test]
    fn unaligned_run_still_splits_after_four() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder
            .section_entry(0x0010_0000, 5, SECTION, "odd")
            .unwrap();

        let data: Vec<_> = lines(builder.ttb())
            .into_iter()
            .filter(|l| l.kind == RunKind::Data)
            .map(|l| (l.start, l.values.len()))
            .collect();
        assert_eq!(data, [(1, 4), (5, 1)]);
    }

    #[test]
    fn tag_change_flushes() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder.section_entry(0x0000_0000, 2, SECTION, "a").unwrap();
        builder.section_entry(0x0020_0000, 2, SECTION, "b").unwrap();

        let data: Vec<_> = lines(builder.ttb())
            .into_iter()
            .filter(|l| l.kind == RunKind::Data)
            .map(|l| (l.start, l.comment.tag))
            .collect();
        assert_eq!(data, [(0, "a"), (2, "b")]);
    }

    #[test]
    fn zero_gap_is_chunked_on_16_boundaries() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder
            .section_entry(0x0000_0000, 32, SECTION, "low")
            .unwrap();
        builder
            .section_entry(0x0340_0000, 1, SECTION, "high")
            .unwrap();

        let zeros: Vec<_> = lines(builder.ttb())
            .into_iter()
            .filter(|l| l.kind == RunKind::Zero && l.start < 0x34)
            .map(|l| (l.start, l.values.len(), l.comment.index))
            .collect();
        assert_eq!(zeros, [(32, 16, Some(0x20)), (48, 4, Some(0x30))]);
    }

    #[test]
    fn zero_run_after_data_has_no_index_unless_aligned() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder
            .section_entry(0x0000_0000, 3, SECTION, "low")
            .unwrap();

        let lines = lines(builder.ttb());
        assert_eq!(lines[1].kind, RunKind::Zero);
        assert_eq!(lines[1].slots(), 3..16);
        assert!(lines[1].comment.is_empty());
        assert_eq!(lines[2].comment.index, Some(0x10));
    }

    #[test]
    fn render_lines() {
        let mut builder = TableBuilder::new(0x4000, 0x8000);
        builder
            .section_entry(0x0000_0000, 5, SECTION, "SRAM")
            .unwrap();
        builder.section_entry(0x0060_0000, 1, SECTION, "").unwrap();

        let out = render(builder.ttb());
        let head: Vec<_> = out.lines().take(6).collect();
        assert_eq!(
            head,
            [
                "        DCD     0x0001100E, 0x0011100E, 0x0021100E, 0x0031100E   ;# 0000 0x00000000 SRAM",
                "        DCD     0x0041100E                                       ;# 0004 0x00400000 SRAM",
                "        DCD     0",
                "        DCD     0x0061100E                                       ;# 0006 0x00600000",
                "        DCD     0, 0, 0, 0, 0, 0, 0, 0, 0",
                "        DCD     0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0   ;# 0010",
            ]
        );
    }

    #[test]
    fn render_gnu_syntax() {
        let line = Line {
            kind: RunKind::Zero,
            start: 0,
            values: vec![0, 0],
            comment: Comment {
                index: Some(0),
                address: None,
                tag: "",
            },
        };

        let mut out = String::new();
        line.render(AsmSyntax::GNU, &mut out).unwrap();
        assert_eq!(out, format!("{:<65}// 0000\n", "        dcd     0, 0"));
    }

    fn arbitrary_table() -> impl Strategy<Value = TableBuilder> {
        proptest::collection::vec((1u32..6, 0u32..40, 0usize..3), 0..40).prop_map(|regions| {
            let tags = ["a", "b", ""];
            let mut builder = TableBuilder::new(0x4000, 0x8000);
            let mut next = 0u32;
            for (count, gap, tag) in regions {
                let start = next + gap;
                if start + count > u32::from(TABLE_ENTRIES) {
                    break;
                }
                builder
                    .section_entry(start << 20, count, SECTION, tags[tag])
                    .unwrap();
                next = start + count;
            }
            builder
        })
    }

    proptest! {
        #[test]
        fn lines_cover_every_slot_once(builder in arbitrary_table()) {
            let mut next = 0;
            for line in Emitter::new(builder.ttb()) {
                prop_assert!(!line.values.is_empty());
                prop_assert_eq!(line.slots().start, next);
                next = line.slots().end;
            }
            prop_assert_eq!(next, usize::from(TABLE_ENTRIES));
        }

        #[test]
        fn lines_respect_width_limits(builder in arbitrary_table()) {
            for line in Emitter::new(builder.ttb()) {
                match line.kind {
                    RunKind::Data => prop_assert!(line.values.len() <= usize::from(ENTRIES_PER_LINE)),
                    RunKind::Zero => {
                        let last = line.slots().end - 1;
                        prop_assert_eq!(usize::from(line.start) / 16, last / 16);
                    }
                }
            }
        }

        #[test]
        fn data_values_match_records(builder in arbitrary_table()) {
            let values: Vec<_> = Emitter::new(builder.ttb())
                .filter(|line| line.kind == RunKind::Data)
                .flat_map(|line| line.values)
                .collect();
            let expected: Vec<_> = builder.ttb().records().iter().map(|r| r.value).collect();
            prop_assert_eq!(values, expected);
        }
    }
}
