// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::attributes::{AttributeSet, Granularity, MemoryPolicy};
use crate::table::TableBuilder;

fn default_count() -> u32 {
    1
}

/// A platform's physical memory layout, in ascending address order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MemoryMap {
    /// Where the first-level table is placed in the boot image.
    pub ttb_base: u32,
    /// Where the first second-level table is placed in the boot image.
    pub slttb_base: u32,
    #[serde(default, rename = "region")]
    pub regions: Vec<Region>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Region {
    /// A 1 MiB block that is further subdivided into pages.
    Translation {
        address: u32,
        #[serde(default)]
        tag: String,
    },
    /// A run of 4 KiB pages within the most recent translated block.
    Page {
        address: u32,
        #[serde(default = "default_count")]
        count: u32,
        policy: MemoryPolicy,
        #[serde(default)]
        tag: String,
    },
    /// A run of 1 MiB sections.
    Section {
        address: u32,
        #[serde(default = "default_count")]
        count: u32,
        policy: MemoryPolicy,
        #[serde(default)]
        tag: String,
    },
    /// A run of 16 MiB supersections.
    Supersection {
        address: u32,
        #[serde(default = "default_count")]
        count: u32,
        policy: MemoryPolicy,
        #[serde(default)]
        tag: String,
    },
}

impl Region {
    pub fn translation(address: u32, tag: &str) -> Self {
        Self::Translation {
            address,
            tag: tag.to_string(),
        }
    }

    pub fn page(address: u32, count: u32, policy: MemoryPolicy, tag: &str) -> Self {
        Self::Page {
            address,
            count,
            policy,
            tag: tag.to_string(),
        }
    }

    pub fn section(address: u32, count: u32, policy: MemoryPolicy, tag: &str) -> Self {
        Self::Section {
            address,
            count,
            policy,
            tag: tag.to_string(),
        }
    }

    pub fn supersection(address: u32, count: u32, policy: MemoryPolicy, tag: &str) -> Self {
        Self::Supersection {
            address,
            count,
            policy,
            tag: tag.to_string(),
        }
    }

    /// Appends the records for this region to `builder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the region violates the ordering rules of [`TableBuilder`].
    pub fn apply(&self, builder: &mut TableBuilder, attributes: &AttributeSet) -> Result<()> {
        match self {
            Region::Translation { address, tag } => builder.translation_entry(*address, tag),
            Region::Page {
                address,
                count,
                policy,
                tag,
            } => builder.page_entry(
                *address,
                *count,
                attributes.get(*policy, Granularity::Page),
                tag,
            ),
            Region::Section {
                address,
                count,
                policy,
                tag,
            } => builder.section_entry(
                *address,
                *count,
                attributes.get(*policy, Granularity::Section),
                tag,
            ),
            Region::Supersection {
                address,
                count,
                policy,
                tag,
            } => builder.supersection_entry(
                *address,
                *count,
                attributes.get(*policy, Granularity::Supersection),
                tag,
            ),
        }
    }
}

impl MemoryMap {
    /// Builds the translation tables described by this map.
    ///
    /// # Errors
    ///
    /// Returns the first error reported while applying a region.
    pub fn build(&self, attributes: &AttributeSet) -> Result<TableBuilder> {
        let mut builder = TableBuilder::new(self.ttb_base, self.slttb_base);
        for region in &self.regions {
            log::debug!("applying {region:?}");
            region.apply(&mut builder, attributes)?;
        }

        Ok(builder)
    }

    /// The physical layout of the reference AArch32 platform.
    pub fn aarch32() -> Self {
        use MemoryPolicy::{StronglyOrdered, WriteBack};

        Self {
            ttb_base: 0x4000,
            slttb_base: 0x8000,
            regions: vec![
                // first MiB
                Region::translation(0x0000_0000, "1st MB @ 2nd level table"),
                Region::page(0x0000_0000, 80, WriteBack, "SRAM_P0_L"),
                Region::page(0x0008_0000, 1, StronglyOrdered, "Trickbox"),
                Region::page(0x0009_0000, 1, WriteBack, "WFDROM"),
                Region::page(0x000A_0000, 1, WriteBack, "BURINROM"),
                Region::page(0x000B_0000, 1, WriteBack, ""),
                Region::page(0x000C_0000, 3, WriteBack, "(old) EXT AHB"),
                Region::page(0x000F_0000, 1, StronglyOrdered, "GPIO1 & GPIO2"),
                Region::page(0x000F_1000, 1, StronglyOrdered, "I2C"),
                Region::page(0x000F_2000, 1, StronglyOrdered, "IEC"),
                Region::page(0x000F_4000, 1, StronglyOrdered, "RTC"),
                // second MiB
                Region::translation(0x0010_0000, "2nd MB @ 2nd level table"),
                Region::page(0x0010_0000, 1, StronglyOrdered, "DMA_L0_CTRL"),
                Region::page(0x0010_1000, 1, StronglyOrdered, "DMA_L1_CTRL"),
                Region::page(0x0010_2000, 1, StronglyOrdered, "TG_L0_CTRL"),
                Region::page(0x0010_3000, 1, StronglyOrdered, "TM_L0_CTRL"),
                Region::page(0x0010_4000, 1, StronglyOrdered, "SRAM_L0_CTRL"),
                Region::page(0x0010_5000, 1, StronglyOrdered, "SRAM_L1_CTRL"),
                Region::section(0x0030_0000, 1, WriteBack, "SRAM_P0_H (512KB)"),
                Region::section(0x0400_0000, 64, StronglyOrdered, "CMNCFG"),
                Region::section(0x0800_0000, 8, WriteBack, "OCM (8 MB)"),
                Region::section(0x0C00_0000, 1, WriteBack, "SRAM_L0 (128KB)"),
                Region::section(0x1000_0000, 1, WriteBack, "SRAM_L1 (128KB)"),
                Region::section(0x1400_0000, 1, WriteBack, "TM_L0 (4KB)"),
                // SRAM cubes
                Region::supersection(0x2000_0000, 16, WriteBack, "SRAM_M0 Cube (256 MB)"),
                Region::supersection(0x3000_0000, 16, WriteBack, "SRAM_M1 Cube (256 MB)"),
                Region::supersection(0x4000_0000, 16, WriteBack, "SRAM_M2 Cube (256 MB)"),
                Region::supersection(0x5000_0000, 16, WriteBack, "SRAM_M3 Cube (256 MB)"),
            ],
        }
    }
}
