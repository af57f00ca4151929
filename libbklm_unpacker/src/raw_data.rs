use super::constants::{HIT_WORD_LENGTH, NUMBER_OF_SLOTS};

/// The words read out of one finesse slot of a copper board.
///
/// A well formed slot holds `HIT_WORD_LENGTH` words per hit followed by one trailing word, or is
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotBuffer {
    pub words: Vec<u32>,
}

impl SlotBuffer {
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Number of complete hits in the buffer
    pub fn hit_count(&self) -> usize {
        self.words.len() / HIT_WORD_LENGTH
    }

    /// A slot is well framed if it is empty or has exactly one word after its hits
    pub fn is_well_framed(&self) -> bool {
        let count = self.word_count();
        count == 0 || count % HIT_WORD_LENGTH == 1
    }

    /// Iterate over the (word0, word1) pairs of each hit
    pub fn hits(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words
            .chunks_exact(HIT_WORD_LENGTH)
            .map(|pair| (pair[0], pair[1]))
    }
}

/// One entry of a copper board in an event: the trigger header and the four slot buffers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardEntry {
    pub board_id: u32,
    pub trigger_ctime: u32,
    pub trigger_utime: u32,
    pub window_start: u32,
    pub slots: [SlotBuffer; NUMBER_OF_SLOTS],
}

/// All of the BKLM raw data of one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub event_number: u32,
    pub entries: Vec<BoardEntry>,
}

/// Encode one hit into its two hardware words.
///
/// The inverse of the field extraction done by [`RawDigit`](crate::digit::RawDigit). Mostly useful
/// for building test data.
pub fn encode_hit(
    channel: u16,
    axis: u16,
    lane: u16,
    flag: u16,
    ctime: u16,
    tdc: u16,
    charge: u16,
) -> (u32, u32) {
    let bword1 =
        (channel & 0x7F) | ((axis & 0x1) << 7) | ((lane & 0x1F) << 8) | ((flag & 0x3) << 14);
    let word0 = ((bword1 as u32) << 16) | ctime as u32;
    let word1 = (((tdc & 0x7FF) as u32) << 16) | (charge & 0xFFF) as u32;
    (word0, word1)
}
