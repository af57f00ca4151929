//! Default electronics to detector mapping.
//!
//! Used for channels which have no entry in the calibrated [`ChannelMap`](crate::channel_map::ChannelMap).
//! The mapping is derived from the cabling convention of the barrel:
//!
//! 1. the copper board fixes the end (forward/backward) and, with the finesse slot, the sector;
//! 2. the lane fixes the layer and, with the axis, the readout plane;
//! 3. scintillator layers (1 and 2) have a per-cable channel offset, given by [`CHANNEL_RULES`];
//! 4. strips are numbered from the opposite edge of the module to the electronics, so the channel
//!    is flipped within the strip count of the plane ([`STRIP_COUNT_RULES`]), except for the phi
//!    plane of RPC layers in the sectors listed in [`DONT_FLIP_FORWARD`]/[`DONT_FLIP_BACKWARD`].
//!
//! The z plane of backward sector 3 (the chimney) has fewer strips and its own scintillator
//! cabling.
use super::constants::{BKLM_ID, MAX_PACKED_LAYER};
use super::error::DefaultMapError;
use super::module_id::ModuleId;

pub const CHIMNEY_SECTOR: u8 = 3;
/// Sectors whose RPC phi strips are already numbered in detector order
pub const DONT_FLIP_FORWARD: [u8; 4] = [1, 2, 7, 8];
pub const DONT_FLIP_BACKWARD: [u8; 4] = [3, 4, 5, 6];

/// The copper boards which have a default sector assignment.
///
/// Each board serves one half of one end of the barrel: four sectors, one per finesse slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopperBoard {
    /// Forward sectors 3-6
    ForwardLeft,
    /// Forward sectors 7, 8, 1, 2
    ForwardRight,
    /// Backward sectors 3-6
    BackwardLeft,
    /// Backward sectors 7, 8, 1, 2
    BackwardRight,
}

impl TryFrom<u32> for CopperBoard {
    type Error = DefaultMapError;
    fn try_from(board_id: u32) -> Result<Self, Self::Error> {
        match board_id.wrapping_sub(BKLM_ID) {
            1 => Ok(Self::ForwardLeft),
            2 => Ok(Self::ForwardRight),
            3 => Ok(Self::BackwardLeft),
            4 => Ok(Self::BackwardRight),
            _ => Err(DefaultMapError::UnknownCopper(board_id)),
        }
    }
}

impl CopperBoard {
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::ForwardLeft | Self::ForwardRight)
    }

    /// One-based sector read out by the given (zero-based) finesse slot
    pub fn sector(&self, finesse: u8) -> u8 {
        match self {
            Self::ForwardLeft | Self::BackwardLeft => finesse + 3,
            Self::ForwardRight | Self::BackwardRight => {
                if finesse + 7 > 8 {
                    finesse - 1
                } else {
                    finesse + 7
                }
            }
        }
    }
}

/// A scintillator cabling rule: channels `first..=last` of the given cable map to
/// strip `channel + offset`.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRule {
    pub axis: u8,
    pub layer: i32,
    pub chimney: bool,
    pub first: u16,
    pub last: u16,
    pub offset: i32,
}

impl ChannelRule {
    const fn new(axis: u8, layer: i32, chimney: bool, first: u16, last: u16, offset: i32) -> Self {
        ChannelRule { axis, layer, chimney, first, last, offset }
    }

    fn matches(&self, axis: u8, layer: i32, chimney: bool, channel: u16) -> bool {
        self.axis == axis
            && self.layer == layer
            && self.chimney == chimney
            && (self.first..=self.last).contains(&channel)
    }

    fn apply(&self, channel: u16) -> u16 {
        (channel as i32 + self.offset) as u16
    }
}

/// The z cables skip a block of channels, so each z cable is split over two rules.
#[rustfmt::skip]
pub const CHANNEL_RULES: [ChannelRule; 10] = [
    //               axis layer chimney first last offset
    ChannelRule::new(0,   1,    false,  5,    41,  -4),
    ChannelRule::new(0,   2,    false,  3,    44,  -2),
    ChannelRule::new(1,   1,    false,  1,    9,    0),
    ChannelRule::new(1,   1,    false,  16,   60,  -6),
    ChannelRule::new(1,   2,    false,  1,    9,    0),
    ChannelRule::new(1,   2,    false,  16,   60,  -6),
    ChannelRule::new(1,   1,    true,   1,    8,    0),
    ChannelRule::new(1,   1,    true,   16,   45,  -7),
    ChannelRule::new(1,   2,    true,   1,    9,    0),
    ChannelRule::new(1,   2,    true,   17,   45,  -8),
];

/// Number of strips in one plane of a band of layers
#[derive(Debug, Clone, Copy)]
pub struct StripCountRule {
    pub chimney: bool,
    pub plane: u8,
    pub first_layer: i32,
    pub last_layer: i32,
    pub count: u16,
}

impl StripCountRule {
    const fn new(chimney: bool, plane: u8, first_layer: i32, last_layer: i32, count: u16) -> Self {
        StripCountRule { chimney, plane, first_layer, last_layer, count }
    }

    fn matches(&self, chimney: bool, layer: i32, plane: u8) -> bool {
        self.chimney == chimney
            && (self.first_layer..=self.last_layer).contains(&layer)
            && self.plane == plane
    }
}

#[rustfmt::skip]
pub const STRIP_COUNT_RULES: [StripCountRule; 8] = [
    //                  chimney plane layers strips
    StripCountRule::new(true,   0,    1, 2,  38),
    StripCountRule::new(true,   0,    3, 15, 34),
    StripCountRule::new(false,  1,    1, 1,  37),
    StripCountRule::new(false,  1,    2, 2,  42),
    StripCountRule::new(false,  1,    3, 6,  36),
    StripCountRule::new(false,  1,    7, 15, 48),
    StripCountRule::new(false,  0,    1, 2,  54),
    StripCountRule::new(false,  0,    3, 15, 48),
];

/// The chimney only cuts into the z plane; its phi plane is cabled like any other sector.
fn is_chimney(is_forward: bool, sector: u8, plane: u8) -> bool {
    !is_forward && sector == CHIMNEY_SECTOR && plane == 0
}

/// Strip number of a raw channel before flipping. Zero means the channel carries no strip.
///
/// Only the scintillator layers are remapped; RPC channels are already strip numbers.
pub fn get_channel(is_forward: bool, sector: u8, layer: i32, axis: u8, channel: u16) -> u16 {
    if layer > 2 {
        return channel;
    }
    // scintillator axis 1 reads the z plane
    let plane = if axis == 0 { 1 } else { 0 };
    let chimney = is_chimney(is_forward, sector, plane);
    CHANNEL_RULES
        .iter()
        .find(|rule| rule.matches(axis, layer, chimney, channel))
        .map_or(0, |rule| rule.apply(channel))
}

/// Geometry of one readout plane; layer and sector are one-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripGeometry {
    pub is_forward: bool,
    pub sector: u8,
    pub layer: i32,
    pub plane: u8,
}

impl StripGeometry {
    /// Number of strips in the plane, 0 for planes which do not exist
    pub fn max_channel(&self) -> u16 {
        let chimney = is_chimney(self.is_forward, self.sector, self.plane);
        STRIP_COUNT_RULES
            .iter()
            .find(|rule| rule.matches(chimney, self.layer, self.plane))
            .map_or(0, |rule| rule.count)
    }

    pub fn is_flipped(&self) -> bool {
        let dont_flip = if self.is_forward {
            DONT_FLIP_FORWARD.contains(&self.sector)
        } else {
            DONT_FLIP_BACKWARD.contains(&self.sector)
        };
        !(dont_flip && self.layer > 2 && self.plane == 1)
    }

    /// Flip a strip into detector numbering. Returns the strip and whether it is out of range.
    pub fn flip(&self, strip: u16) -> (u16, bool) {
        let max = self.max_channel();
        let in_range = strip > 0 && strip <= max;
        let strip = if self.is_flipped() && in_range {
            max - strip + 1
        } else {
            strip
        };
        (strip, strip < 1 || strip > max)
    }
}

/// Result of the default mapping. Out-of-range channels still carry their module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultMapping {
    pub module_id: ModuleId,
    pub out_of_range: bool,
}

/// Map a raw channel to a ModuleId without the calibration.
///
/// `board_id` is the full copper node id and `finesse` the zero-based slot. Boards other than the
/// four in [`CopperBoard`] and lanes which do not give a packable layer are errors.
pub fn default_module_id(
    board_id: u32,
    finesse: u8,
    lane: u8,
    axis: u8,
    channel: u16,
) -> Result<DefaultMapping, DefaultMapError> {
    let copper = CopperBoard::try_from(board_id)?;
    let is_forward = copper.is_forward();
    let sector = copper.sector(finesse);

    let (layer, plane) = if lane > 2 {
        (lane as i32 - 5, axis)
    } else {
        (lane as i32, if axis == 0 { 1 } else { 0 })
    };
    if layer < 1 || layer > MAX_PACKED_LAYER {
        return Err(DefaultMapError::InvalidLayer { lane, layer });
    }

    let geometry = StripGeometry {
        is_forward,
        sector,
        layer,
        plane,
    };
    let strip = get_channel(is_forward, sector, layer, axis, channel);
    let (strip, out_of_range) = geometry.flip(strip);

    Ok(DefaultMapping {
        module_id: ModuleId::from_one_based(
            is_forward,
            sector as u32,
            layer as u32,
            plane as u32,
            strip as u32,
        ),
        out_of_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_geometries() -> Vec<StripGeometry> {
        let mut geometries = Vec::new();
        for is_forward in [true, false] {
            for sector in 1..=8 {
                for layer in 1..=15 {
                    for plane in 0..=1 {
                        geometries.push(StripGeometry {
                            is_forward,
                            sector,
                            layer,
                            plane,
                        });
                    }
                }
            }
        }
        geometries
    }

    #[test]
    fn test_copper_sectors() {
        let boards = [BKLM_ID + 1, BKLM_ID + 2, BKLM_ID + 3, BKLM_ID + 4];
        let mut forward: Vec<u8> = Vec::new();
        let mut backward: Vec<u8> = Vec::new();
        for board_id in boards {
            let copper = CopperBoard::try_from(board_id).unwrap();
            for finesse in 0..4 {
                if copper.is_forward() {
                    forward.push(copper.sector(finesse));
                } else {
                    backward.push(copper.sector(finesse));
                }
            }
        }
        forward.sort();
        backward.sort();
        assert_eq!(forward, (1..=8).collect::<Vec<u8>>());
        assert_eq!(backward, (1..=8).collect::<Vec<u8>>());
        assert_eq!(CopperBoard::ForwardRight.sector(0), 7);
        assert_eq!(CopperBoard::ForwardRight.sector(3), 2);
    }

    #[test]
    fn test_unknown_copper() {
        assert_eq!(
            default_module_id(BKLM_ID, 0, 10, 0, 5),
            Err(DefaultMapError::UnknownCopper(BKLM_ID))
        );
        assert_eq!(
            default_module_id(BKLM_ID + 5, 0, 10, 0, 5),
            Err(DefaultMapError::UnknownCopper(BKLM_ID + 5))
        );
    }

    #[test]
    fn test_invalid_layer() {
        assert_eq!(
            default_module_id(BKLM_ID + 1, 0, 4, 0, 5),
            Err(DefaultMapError::InvalidLayer { lane: 4, layer: -1 })
        );
        assert_eq!(
            default_module_id(BKLM_ID + 1, 0, 22, 0, 5),
            Err(DefaultMapError::InvalidLayer { lane: 22, layer: 17 })
        );
        assert!(default_module_id(BKLM_ID + 1, 0, 21, 0, 5).is_ok());
    }

    #[test]
    fn test_every_existing_plane_has_strips() {
        for geometry in all_geometries() {
            assert!(geometry.max_channel() > 0, "{:?}", geometry);
        }
        let missing = StripGeometry {
            is_forward: true,
            sector: 1,
            layer: 16,
            plane: 0,
        };
        assert_eq!(missing.max_channel(), 0);
    }

    #[test]
    fn test_flip_is_involution() {
        for geometry in all_geometries() {
            let max = geometry.max_channel();
            for strip in 1..=max {
                let (once, out_of_range) = geometry.flip(strip);
                assert!(!out_of_range);
                let (twice, _) = geometry.flip(once);
                assert_eq!(twice, strip, "{:?}", geometry);
                if !geometry.is_flipped() {
                    assert_eq!(once, strip);
                }
            }
            assert!(geometry.flip(0).1);
            assert!(geometry.flip(max + 1).1);
        }
    }

    #[test]
    fn test_get_channel_scintillators() {
        // phi cables start past the first few channels
        assert_eq!(get_channel(false, 1, 1, 0, 4), 0);
        assert_eq!(get_channel(false, 1, 1, 0, 5), 1);
        assert_eq!(get_channel(false, 1, 1, 0, 41), 37);
        assert_eq!(get_channel(false, 1, 1, 0, 42), 0);
        assert_eq!(get_channel(false, 1, 2, 0, 2), 0);
        assert_eq!(get_channel(false, 1, 2, 0, 3), 1);
        assert_eq!(get_channel(false, 1, 2, 0, 44), 42);
        // z cables skip channels 10 to 15
        assert_eq!(get_channel(false, 1, 1, 1, 9), 9);
        assert_eq!(get_channel(false, 1, 1, 1, 10), 0);
        assert_eq!(get_channel(false, 1, 1, 1, 15), 0);
        assert_eq!(get_channel(false, 1, 1, 1, 16), 10);
        assert_eq!(get_channel(false, 1, 1, 1, 60), 54);
        assert_eq!(get_channel(false, 1, 2, 1, 61), 0);
        // RPC channels pass through
        assert_eq!(get_channel(true, 3, 7, 1, 100), 100);
    }

    #[test]
    fn test_get_channel_chimney() {
        // backward sector 3 z cables
        assert_eq!(get_channel(false, 3, 1, 1, 8), 8);
        assert_eq!(get_channel(false, 3, 1, 1, 9), 0);
        assert_eq!(get_channel(false, 3, 1, 1, 16), 9);
        assert_eq!(get_channel(false, 3, 1, 1, 45), 38);
        assert_eq!(get_channel(false, 3, 1, 1, 46), 0);
        assert_eq!(get_channel(false, 3, 2, 1, 9), 9);
        assert_eq!(get_channel(false, 3, 2, 1, 16), 0);
        assert_eq!(get_channel(false, 3, 2, 1, 17), 10);
        assert_eq!(get_channel(false, 3, 2, 1, 45), 38);
        // the chimney phi cable and forward sector 3 are cabled normally
        assert_eq!(get_channel(false, 3, 2, 0, 44), 42);
        assert_eq!(get_channel(true, 3, 1, 1, 60), 54);
    }

    #[test]
    fn test_chimney_strip_counts() {
        let geometry = |is_forward, layer, plane| StripGeometry {
            is_forward,
            sector: CHIMNEY_SECTOR,
            layer,
            plane,
        };
        assert_eq!(geometry(false, 1, 0).max_channel(), 38);
        assert_eq!(geometry(false, 7, 0).max_channel(), 34);
        assert_eq!(geometry(false, 7, 1).max_channel(), 48);
        assert_eq!(geometry(false, 1, 1).max_channel(), 37);
        assert_eq!(geometry(true, 7, 0).max_channel(), 48);
        assert_eq!(geometry(true, 7, 1).max_channel(), 48);
        assert_eq!(geometry(true, 2, 0).max_channel(), 54);
    }

    #[test]
    fn test_cabling_fills_every_scintillator_plane() {
        for geometry in all_geometries().into_iter().filter(|g| g.layer <= 2) {
            let axis = if geometry.plane == 1 { 0 } else { 1 };
            let mut strips: Vec<u16> = (0..128)
                .map(|ch| get_channel(geometry.is_forward, geometry.sector, geometry.layer, axis, ch))
                .filter(|&s| s > 0)
                .collect();
            strips.sort();
            let expected: Vec<u16> = (1..=geometry.max_channel()).collect();
            assert_eq!(strips, expected, "{:?}", geometry);
        }
    }

    #[test]
    fn test_default_rpc_not_flipped() {
        // backward board 3, finesse 1 -> sector 4; lane 10 -> layer 5; axis 1 -> phi plane
        let mapping = default_module_id(BKLM_ID + 3, 1, 10, 1, 20).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(false, 4, 5, 1, 20));
    }

    #[test]
    fn test_default_rpc_flipped() {
        // forward sector 4, layer 5, z plane: 48 strips
        let mapping = default_module_id(BKLM_ID + 1, 1, 10, 0, 20).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(true, 4, 5, 0, 29));
    }

    #[test]
    fn test_default_out_of_range() {
        let mapping = default_module_id(BKLM_ID + 1, 1, 10, 0, 60).unwrap();
        assert!(mapping.out_of_range);
        // scintillator channel before the first strip of its cable
        let mapping = default_module_id(BKLM_ID + 3, 0, 1, 0, 4).unwrap();
        assert!(mapping.out_of_range);
    }

    #[test]
    fn test_default_scintillator() {
        // lane 1 axis 0 is the layer 1 phi plane (37 strips), normal even in the chimney sector
        let mapping = default_module_id(BKLM_ID + 3, 0, 1, 0, 5).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(false, 3, 1, 1, 37));
        // forward sector 3 z plane keeps the full 54 strips
        let mapping = default_module_id(BKLM_ID + 1, 0, 1, 1, 60).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(true, 3, 1, 0, 1));
    }

    #[test]
    fn test_default_chimney() {
        // backward board, finesse 0 -> sector 3; lane 1 axis 1 -> layer 1 z plane, inside the gap
        assert_eq!(get_channel(false, 3, 1, 1, 12), 0);
        let mapping = default_module_id(BKLM_ID + 3, 0, 1, 1, 12).unwrap();
        assert!(mapping.out_of_range);
        assert_eq!(mapping.module_id.strip(), 0);

        // lane 12 axis 0 -> RPC layer 7 z plane, 34 strips
        let mapping = default_module_id(BKLM_ID + 3, 0, 12, 0, 34).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(false, 3, 7, 0, 1));
        let mapping = default_module_id(BKLM_ID + 3, 0, 12, 0, 35).unwrap();
        assert!(mapping.out_of_range);
    }

    #[test]
    fn test_default_forward_sector_three() {
        // lane 12 axis 1 -> RPC layer 7 phi plane, 48 strips and flipped
        let mapping = default_module_id(BKLM_ID + 1, 0, 12, 1, 40).unwrap();
        assert!(!mapping.out_of_range);
        assert_eq!(mapping.module_id, ModuleId::from_one_based(true, 3, 7, 1, 9));
    }
}
