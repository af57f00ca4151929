use super::error::ElectronicsIdError;

const COPPER_MASK: u32 = 0xF;
const FINESSE_MASK: u32 = 0x3;
const LANE_MASK: u32 = 0x1F;
const AXIS_MASK: u32 = 0x1;
const CHANNEL_MASK: u32 = 0x3F;

const FINESSE_SHIFT: u32 = 4;
const LANE_SHIFT: u32 = 6;
const AXIS_SHIFT: u32 = 11;
const CHANNEL_SHIFT: u32 = 12;

/// ElectronicsId is the address of a single readout channel as seen by the electronics.
///
/// The copper field is the board index relative to [`BKLM_ID`](crate::constants::BKLM_ID), not
/// the full node id. The packed [`key`](ElectronicsId::key) is what the channel map is indexed by;
/// persisted calibrations were built with the same packing, so it must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElectronicsId {
    pub copper: u8,
    pub finesse: u8,
    pub lane: u8,
    pub axis: u8,
    pub channel: u8,
}

impl ElectronicsId {
    /// Construct an ElectronicsId, silently masking every field to its bit width.
    ///
    /// This is the packing used by the hardware decode; wider values wrap rather than fail.
    pub fn new(copper: u32, finesse: u32, lane: u32, axis: u32, channel: u32) -> Self {
        ElectronicsId {
            copper: (copper & COPPER_MASK) as u8,
            finesse: (finesse & FINESSE_MASK) as u8,
            lane: (lane & LANE_MASK) as u8,
            axis: (axis & AXIS_MASK) as u8,
            channel: (channel & CHANNEL_MASK) as u8,
        }
    }

    /// Construct an ElectronicsId, rejecting any field which does not fit its bit width
    pub fn try_new(
        copper: u32,
        finesse: u32,
        lane: u32,
        axis: u32,
        channel: u32,
    ) -> Result<Self, ElectronicsIdError> {
        if copper > COPPER_MASK {
            return Err(ElectronicsIdError::BadCopper(copper));
        }
        if finesse > FINESSE_MASK {
            return Err(ElectronicsIdError::BadFinesse(finesse));
        }
        if lane > LANE_MASK {
            return Err(ElectronicsIdError::BadLane(lane));
        }
        if axis > AXIS_MASK {
            return Err(ElectronicsIdError::BadAxis(axis));
        }
        if channel > CHANNEL_MASK {
            return Err(ElectronicsIdError::BadChannel(channel));
        }
        Ok(Self::new(copper, finesse, lane, axis, channel))
    }

    /// Pack the address into the dense channel map key
    pub fn key(&self) -> u32 {
        (self.copper as u32 & COPPER_MASK)
            | (self.finesse as u32 & FINESSE_MASK) << FINESSE_SHIFT
            | (self.lane as u32 & LANE_MASK) << LANE_SHIFT
            | (self.axis as u32 & AXIS_MASK) << AXIS_SHIFT
            | (self.channel as u32 & CHANNEL_MASK) << CHANNEL_SHIFT
    }

    /// Unpack a channel map key
    pub fn from_key(key: u32) -> Self {
        Self::new(
            key,
            key >> FINESSE_SHIFT,
            key >> LANE_SHIFT,
            key >> AXIS_SHIFT,
            key >> CHANNEL_SHIFT,
        )
    }
}

/// Split a 32-bit hardware word into its (low, high) 16-bit halves
pub fn split_word(word: u32) -> (u16, u16) {
    ((word & 0xFFFF) as u16, ((word >> 16) & 0xFFFF) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trip() {
        for copper in 0..16 {
            for finesse in 0..4 {
                for lane in 0..32 {
                    for axis in 0..2 {
                        for channel in 0..64 {
                            let id = ElectronicsId::new(copper, finesse, lane, axis, channel);
                            let back = ElectronicsId::from_key(id.key());
                            assert_eq!(id, back);
                            assert_eq!(back.copper as u32, copper);
                            assert_eq!(back.channel as u32, channel);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_key_layout() {
        let id = ElectronicsId::new(1, 2, 3, 1, 5);
        assert_eq!(id.key(), 1 | 2 << 4 | 3 << 6 | 1 << 11 | 5 << 12);
    }

    #[test]
    fn test_wide_fields_truncate() {
        // channel 69 has a seventh bit the key cannot hold
        let wide = ElectronicsId::new(0x11, 4, 33, 2, 69);
        assert_eq!(wide, ElectronicsId::new(1, 0, 1, 0, 5));
    }

    #[test]
    fn test_try_new_rejects_wide_fields() {
        assert_eq!(
            ElectronicsId::try_new(16, 0, 0, 0, 0),
            Err(ElectronicsIdError::BadCopper(16))
        );
        assert_eq!(
            ElectronicsId::try_new(0, 0, 0, 0, 64),
            Err(ElectronicsIdError::BadChannel(64))
        );
        assert!(ElectronicsId::try_new(15, 3, 31, 1, 63).is_ok());
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word(0xDEAD_BEEF), (0xBEEF, 0xDEAD));
        assert_eq!(split_word(0), (0, 0));
    }
}
