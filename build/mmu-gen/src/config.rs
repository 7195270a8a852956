use std::fs;
use std::path::Path;

use anyhow::Context;
use short_descriptor::MemoryMap;

/// Reads a TOML memory map description from `path`.
pub fn load_memory_map(path: &Path) -> anyhow::Result<MemoryMap> {
    let str = fs::read_to_string(path)
        .with_context(|| format!("failed to read memory map {}", path.display()))?;

    let map = parse_memory_map(&str)
        .with_context(|| format!("failed to parse memory map {}", path.display()))?;

    log::debug!(
        "loaded {} regions from {}",
        map.regions.len(),
        path.display()
    );

    Ok(map)
}

fn parse_memory_map(str: &str) -> anyhow::Result<MemoryMap> {
    Ok(toml::from_str(str)?)
}

#[cfg(test)]
mod tests {
    use short_descriptor::{MemoryPolicy, Region};

    use super::*;

    #[test]
    fn bundled_map_matches_builtin() {
        let map = parse_memory_map(include_str!("../maps/aarch32.toml")).unwrap();
        assert_eq!(map, MemoryMap::aarch32());
    }

    #[test]
    fn count_and_tag_default() {
        let map = parse_memory_map(
            r#"
            ttb-base = 0x4000
            slttb-base = 0x8000

            [[region]]
            kind = "section"
            address = 0x00300000
            policy = "device"
            "#,
        )
        .unwrap();

        assert_eq!(
            map.regions,
            [Region::section(0x0030_0000, 1, MemoryPolicy::Device, "")]
        );
    }

    #[test]
    fn no_regions() {
        let map = parse_memory_map("ttb-base = 0\nslttb-base = 0x400\n").unwrap();
        assert!(map.regions.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(
            parse_memory_map(
                r#"
                ttb-base = 0x4000
                slttb-base = 0x8000

                [[region]]
                kind = "section"
                address = 0x00300000
                policy = "device"
                size = 4
                "#,
            )
            .is_err()
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(
            parse_memory_map(
                r#"
                ttb-base = 0x4000
                slttb-base = 0x8000

                [[region]]
                kind = "block"
                address = 0
                "#,
            )
            .is_err()
        );
    }

    #[test]
    fn addresses_must_fit_32_bits() {
        assert!(
            parse_memory_map(
                r#"
                ttb-base = 0x4000
                slttb-base = 0x8000

                [[region]]
                kind = "translation"
                address = 0x100000000
                "#,
            )
            .is_err()
        );
    }
}
