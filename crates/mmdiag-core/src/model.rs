//! Validated in-memory model for a memory-map diagram.
//!
//! Addresses and sizes travel as `0x`-prefixed hex strings in the description
//! and are held as [`HexValue`] internally. The model carries no derived
//! layout data; free space and collisions are computed separately by
//! [`crate::layout`].

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative byte address or byte count parsed from a `0x`-prefixed
/// hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HexValue(pub u64);

impl HexValue {
    /// Parses a `0x`-prefixed hex string, naming `field` in the error.
    pub fn parse(field: &'static str, value: &str) -> Result<Self> {
        let digits = value
            .strip_prefix("0x")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::MalformedHex {
                field,
                value: value.to_string(),
            })?;
        let parsed = u64::from_str_radix(digits, 16).map_err(|_| Error::MalformedHex {
            field,
            value: value.to_string(),
        })?;
        Ok(Self(parsed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl<'de> Deserialize<'de> for HexValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HexValue::parse("address/size", &raw).map_err(D::Error::custom)
    }
}

impl Serialize for HexValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A named byte-addressable interval `[origin, origin + size)` within a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRegion {
    #[serde(rename = "memory_region_origin")]
    pub origin: HexValue,
    #[serde(rename = "memory_region_size")]
    pub size: HexValue,
    /// Links to same-size regions elsewhere, as `(map name, region name)`.
    #[serde(rename = "memory_region_links", default)]
    pub links: Vec<(String, String)>,
}

impl MemoryRegion {
    pub fn new(origin: HexValue, size: HexValue) -> Self {
        Self {
            origin,
            size,
            links: Vec::new(),
        }
    }

    /// End address of the region (one past the last byte).
    pub fn end(&self) -> u64 {
        self.origin.0 + self.size.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMap {
    pub map_height: u64,
    pub map_width: u64,
    /// Declaration order is preserved; the layout pass does not rely on it
    /// being sorted by origin.
    pub memory_regions: IndexMap<String, MemoryRegion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagram {
    pub diagram_name: String,
    pub diagram_height: u64,
    pub diagram_width: u64,
    pub memory_maps: IndexMap<String, MemoryMap>,
}

impl Diagram {
    /// Deserializes a JSON description and validates it (fail-fast).
    pub fn from_json(text: &str) -> Result<Self> {
        let diagram: Diagram = serde_json::from_str(text)?;
        diagram.validate()?;
        Ok(diagram)
    }

    /// Checks the whole model once, before any layout or rendering runs.
    ///
    /// Rules: non-empty names, positive region sizes, and every region link
    /// must reference an existing map/region pair whose size matches the
    /// linking region exactly.
    pub fn validate(&self) -> Result<()> {
        if self.diagram_name.is_empty() {
            return Err(Error::EmptyName {
                field: "diagram_name",
            });
        }

        for (map_name, map) in &self.memory_maps {
            if map_name.is_empty() {
                return Err(Error::EmptyName { field: "map name" });
            }
            for (region_name, region) in &map.memory_regions {
                if region_name.is_empty() {
                    return Err(Error::EmptyName {
                        field: "region name",
                    });
                }
                if region.size.0 == 0 {
                    return Err(Error::ZeroSize {
                        map: map_name.clone(),
                        region: region_name.clone(),
                    });
                }
                // `end()` must stay representable; layout arithmetic relies
                // on it.
                if region.origin.0.checked_add(region.size.0).is_none() {
                    return Err(Error::RegionTooLarge {
                        map: map_name.clone(),
                        region: region_name.clone(),
                    });
                }
                for (target_map, target_region) in &region.links {
                    let target = self
                        .memory_maps
                        .get(target_map)
                        .and_then(|m| m.memory_regions.get(target_region))
                        .ok_or_else(|| Error::DanglingLink {
                            region: region_name.clone(),
                            target_map: target_map.clone(),
                            target_region: target_region.clone(),
                        })?;
                    if target.size != region.size {
                        return Err(Error::LinkSizeMismatch {
                            region: region_name.clone(),
                            target_map: target_map.clone(),
                            target_region: target_region.clone(),
                            expected: region.size.0,
                            found: target.size.0,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
