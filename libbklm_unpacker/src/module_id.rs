//! Packed BKLM detector identifier.
//!
//! Layout of the packed word:
//!
//! ```text
//! bit   0-5   strip-1   [0..63]
//! bit   6     plane     [0..1]
//! bit   7-10  layer-1   [0..15], only 0..14 exist
//! bit  11-13  sector-1  [0..7]
//! bit  14     end       set for the forward end
//! bit  22     in RPC    set for layers past the scintillators
//! ```
use std::fmt;

pub const STRIP_BIT: u32 = 0;
pub const PLANE_BIT: u32 = 6;
pub const LAYER_BIT: u32 = 7;
pub const SECTOR_BIT: u32 = 11;
pub const END_BIT: u32 = 14;
pub const INRPC_BIT: u32 = 22;

pub const STRIP_MASK: u32 = 0x3F << STRIP_BIT;
pub const PLANE_MASK: u32 = 1 << PLANE_BIT;
pub const LAYER_MASK: u32 = 0xF << LAYER_BIT;
pub const SECTOR_MASK: u32 = 0x7 << SECTOR_BIT;
pub const END_MASK: u32 = 1 << END_BIT;
pub const INRPC_MASK: u32 = 1 << INRPC_BIT;

/// ModuleId identifies one strip of the barrel KLM. All indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Pack a module id from zero-based sector, layer and strip. The in-RPC bit is never set here.
    pub fn new(is_forward: bool, sector: u32, layer: u32, plane: u32, strip: u32) -> Self {
        let end = if is_forward { END_MASK } else { 0 };
        ModuleId(
            end | ((sector << SECTOR_BIT) & SECTOR_MASK)
                | ((layer << LAYER_BIT) & LAYER_MASK)
                | ((plane << PLANE_BIT) & PLANE_MASK)
                | ((strip << STRIP_BIT) & STRIP_MASK),
        )
    }

    /// Pack a module id from the one-based numbering used by calibration tables
    pub fn from_one_based(is_forward: bool, sector: u32, layer: u32, plane: u32, strip: u32) -> Self {
        Self::new(
            is_forward,
            sector.saturating_sub(1),
            layer.saturating_sub(1),
            plane,
            strip.saturating_sub(1),
        )
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn is_forward(&self) -> bool {
        self.0 & END_MASK != 0
    }

    pub fn sector(&self) -> u32 {
        (self.0 & SECTOR_MASK) >> SECTOR_BIT
    }

    pub fn layer(&self) -> u32 {
        (self.0 & LAYER_MASK) >> LAYER_BIT
    }

    pub fn plane(&self) -> u32 {
        (self.0 & PLANE_MASK) >> PLANE_BIT
    }

    pub fn strip(&self) -> u32 {
        (self.0 & STRIP_MASK) >> STRIP_BIT
    }

    pub fn is_in_rpc(&self) -> bool {
        self.0 & INRPC_MASK != 0
    }

    /// Return a copy with the in-RPC bit set
    pub fn with_in_rpc(self) -> Self {
        ModuleId(self.0 | INRPC_MASK)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sector {} layer {} plane {} strip {}",
            if self.is_forward() { "forward" } else { "backward" },
            self.sector(),
            self.layer(),
            self.plane(),
            self.strip()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let id = ModuleId::new(true, 5, 12, 1, 40);
        assert!(id.is_forward());
        assert_eq!(id.sector(), 5);
        assert_eq!(id.layer(), 12);
        assert_eq!(id.plane(), 1);
        assert_eq!(id.strip(), 40);
        assert!(!id.is_in_rpc());
        assert!(id.with_in_rpc().is_in_rpc());
        assert_eq!(id.with_in_rpc().strip(), 40);
    }

    #[test]
    fn test_one_based() {
        let id = ModuleId::from_one_based(false, 2, 3, 0, 10);
        assert_eq!(id, ModuleId::new(false, 1, 2, 0, 9));
        assert_eq!(
            id.raw(),
            (1 << SECTOR_BIT) | (2 << LAYER_BIT) | (9 << STRIP_BIT)
        );
    }

    #[test]
    fn test_fields_do_not_bleed() {
        // layer 16 (one-based 17) would spill into the sector bits without masking
        let id = ModuleId::new(false, 0, 16, 0, 0);
        assert_eq!(id.sector(), 0);
        assert_eq!(id.layer(), 0);
    }
}
