// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Memory attribute encodings for short-descriptor translation table entries.
//!
//! Every attribute value is a pre-shifted bit pattern with all base address bits clear, ready to be
//! OR'd with the output address of a section, supersection or page.

use serde::{Deserialize, Serialize};

mycelium_bitfield::bitfield! {
    /// A first-level section (1 MiB) or supersection (16 MiB) descriptor.
    #[derive(PartialEq, Eq)]
    pub struct SectionDescriptor<u32> {
        /// Descriptor type, `0b10` for sections and supersections.
        pub const TYPE = 2;
        /// Bufferable.
        pub const B: bool;
        /// Cacheable.
        pub const C: bool;
        /// Execute never.
        pub const XN: bool;
        pub const DOMAIN = 4;
        // Implementation defined
        const _IMP = 1;
        /// Access permissions.
        pub const AP = 2;
        /// Type extension, together with `C` and `B` selects the memory type.
        pub const TEX = 3;
        /// Access permissions extension.
        pub const APX: bool;
        /// Shareable.
        pub const S: bool;
        /// Not global.
        pub const NG: bool;
        /// Set for 16 MiB supersections.
        pub const SUPERSECTION: bool;
        /// Non-secure.
        pub const NS: bool;
        /// Section base address bits `[31:20]`.
        pub const BASE = 12;
    }
}

mycelium_bitfield::bitfield! {
    /// A second-level small page (4 KiB) descriptor.
    #[derive(PartialEq, Eq)]
    pub struct PageDescriptor<u32> {
        /// Descriptor type, `0b10` for small pages with execution permitted.
        pub const TYPE = 2;
        /// Bufferable.
        pub const B: bool;
        /// Cacheable.
        pub const C: bool;
        /// Access permissions.
        pub const AP = 2;
        /// Type extension, together with `C` and `B` selects the memory type.
        pub const TEX = 3;
        /// Access permissions extension.
        pub const APX: bool;
        /// Shareable.
        pub const S: bool;
        /// Not global.
        pub const NG: bool;
        /// Small page base address bits `[31:12]`.
        pub const BASE = 20;
    }
}

const DESCRIPTOR_TYPE: u32 = 0b10;

/// The caching and ordering behaviour of a memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryPolicy {
    /// Normal memory, write-back write-allocate, shareable.
    WriteBack,
    /// Device memory.
    Device,
    /// Strongly-ordered memory, shareable.
    StronglyOrdered,
}

impl MemoryPolicy {
    pub const ALL: [MemoryPolicy; 3] = [
        MemoryPolicy::WriteBack,
        MemoryPolicy::Device,
        MemoryPolicy::StronglyOrdered,
    ];
}

/// The size of the block a single descriptor maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// 4 KiB second-level page.
    Page,
    /// 1 MiB first-level section.
    Section,
    /// 16 MiB first-level supersection.
    Supersection,
}

impl Granularity {
    /// Returns the number of bytes a single descriptor of this granularity maps.
    pub const fn block_size(self) -> u32 {
        match self {
            Granularity::Page => 4 * crate::KIB,
            Granularity::Section => crate::MIB,
            Granularity::Supersection => 16 * crate::MIB,
        }
    }
}

/// The encoded attribute bits for every [`MemoryPolicy`] at every [`Granularity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSet {
    page: [u32; 3],
    section: [u32; 3],
    supersection: [u32; 3],
}

impl AttributeSet {
    /// The attribute table used by the AArch32 short-descriptor format.
    pub fn short_descriptor() -> Self {
        let mut set = Self {
            page: [0; 3],
            section: [0; 3],
            supersection: [0; 3],
        };

        for (slot, policy) in MemoryPolicy::ALL.into_iter().enumerate() {
            set.page[slot] = page_attributes(policy).bits();
            set.section[slot] = section_attributes(policy).bits();
            set.supersection[slot] = section_attributes(policy)
                .with(SectionDescriptor::SUPERSECTION, true)
                .bits();
        }

        set
    }

    /// Returns the attribute bits for `policy` at the given `granularity`.
    pub fn get(&self, policy: MemoryPolicy, granularity: Granularity) -> u32 {
        let slot = match policy {
            MemoryPolicy::WriteBack => 0,
            MemoryPolicy::Device => 1,
            MemoryPolicy::StronglyOrdered => 2,
        };

        match granularity {
            Granularity::Page => self.page[slot],
            Granularity::Section => self.section[slot],
            Granularity::Supersection => self.supersection[slot],
        }
    }
}

fn section_attributes(policy: MemoryPolicy) -> SectionDescriptor {
    let desc = SectionDescriptor::new()
        .with(SectionDescriptor::TYPE, DESCRIPTOR_TYPE)
        .with(SectionDescriptor::S, true);

    match policy {
        MemoryPolicy::WriteBack => desc
            .with(SectionDescriptor::TEX, 0b001)
            .with(SectionDescriptor::C, true)
            .with(SectionDescriptor::B, true),
        MemoryPolicy::Device => desc.with(SectionDescriptor::B, true),
        MemoryPolicy::StronglyOrdered => desc,
    }
}

fn page_attributes(policy: MemoryPolicy) -> PageDescriptor {
    let desc = PageDescriptor::new().with(PageDescriptor::TYPE, DESCRIPTOR_TYPE);

    // NB: write-back pages are not marked shareable
    match policy {
        MemoryPolicy::WriteBack => desc
            .with(PageDescriptor::TEX, 0b001)
            .with(PageDescriptor::C, true)
            .with(PageDescriptor::B, true),
        MemoryPolicy::Device => desc
            .with(PageDescriptor::B, true)
            .with(PageDescriptor::S, true),
        MemoryPolicy::StronglyOrdered => desc.with(PageDescriptor::S, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_descriptor_encodings() {
        let set = AttributeSet::short_descriptor();

        let expected = [
            (MemoryPolicy::WriteBack, Granularity::Page, 0x0000_004E),
            (MemoryPolicy::Device, Granularity::Page, 0x0000_0406),
            (MemoryPolicy::StronglyOrdered, Granularity::Page, 0x0000_0402),
            (MemoryPolicy::WriteBack, Granularity::Section, 0x0001_100E),
            (MemoryPolicy::Device, Granularity::Section, 0x0001_0006),
            (MemoryPolicy::StronglyOrdered, Granularity::Section, 0x0001_0002),
            (MemoryPolicy::WriteBack, Granularity::Supersection, 0x0005_100E),
            (MemoryPolicy::Device, Granularity::Supersection, 0x0005_0006),
            (MemoryPolicy::StronglyOrdered, Granularity::Supersection, 0x0005_0002),
        ];

        for (policy, granularity, bits) in expected {
            assert_eq!(set.get(policy, granularity), bits);
        }
    }

    #[test]
    fn attributes_leave_base_address_clear() {
        let set = AttributeSet::short_descriptor();

        for policy in MemoryPolicy::ALL {
            assert_eq!(set.get(policy, Granularity::Page) & 0xFFFF_F000, 0);
            assert_eq!(set.get(policy, Granularity::Section) & 0xFFF0_0000, 0);
            assert_eq!(set.get(policy, Granularity::Supersection) & 0xFF00_0000, 0);
        }
    }

    #[test]
    fn decode_section() {
        let desc = SectionDescriptor::from_bits(0x0005_100E);

        assert_eq!(desc.get(SectionDescriptor::TYPE), DESCRIPTOR_TYPE);
        assert_eq!(desc.get(SectionDescriptor::TEX), 0b001);
        assert!(desc.get(SectionDescriptor::C));
        assert!(desc.get(SectionDescriptor::B));
        assert!(desc.get(SectionDescriptor::S));
        assert!(desc.get(SectionDescriptor::SUPERSECTION));
        assert!(!desc.get(SectionDescriptor::XN));
    }

    #[test]
    fn block_sizes() {
        assert_eq!(Granularity::Page.block_size(), 0x1000);
        assert_eq!(Granularity::Section.block_size(), 0x10_0000);
        assert_eq!(Granularity::Supersection.block_size(), 0x100_0000);
    }
}
