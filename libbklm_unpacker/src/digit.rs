use super::hardware_id::split_word;
use super::module_id::ModuleId;

/// Hit flag value of an RPC hit
pub const FLAG_RPC: u16 = 1;
/// Hit flag value of a scintillator hit
pub const FLAG_SCINT: u16 = 2;

/// The four 16-bit halves of one hit, kept exactly as read for diagnostics.
///
/// ```text
/// bword1: flag[15:14] lane[12:8] axis[7] channel[6:0]
/// bword2: ctime[15:0]
/// bword3: tdc[10:0]
/// bword4: charge[11:0]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawDigit {
    pub board_id: u32,
    pub slot: u8,
    pub bword1: u16,
    pub bword2: u16,
    pub bword3: u16,
    pub bword4: u16,
}

impl RawDigit {
    /// Split the two hardware words of a hit
    pub fn new(board_id: u32, slot: u8, word0: u32, word1: u32) -> Self {
        let (bword2, bword1) = split_word(word0);
        let (bword4, bword3) = split_word(word1);
        Self {
            board_id,
            slot,
            bword1,
            bword2,
            bword3,
            bword4,
        }
    }

    pub fn channel(&self) -> u16 {
        self.bword1 & 0x7F
    }

    pub fn axis(&self) -> u16 {
        (self.bword1 >> 7) & 0x1
    }

    pub fn lane(&self) -> u16 {
        (self.bword1 >> 8) & 0x1F
    }

    /// 1 for RPC hits, 2 for scintillator hits
    pub fn flag(&self) -> u16 {
        (self.bword1 >> 14) & 0x3
    }

    pub fn ctime(&self) -> u16 {
        self.bword2
    }

    pub fn tdc(&self) -> u16 {
        self.bword3 & 0x7FF
    }

    /// Raw ADC value, before baseline subtraction
    pub fn charge(&self) -> u16 {
        self.bword4 & 0xFFF
    }
}

/// An accepted, mapped hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digit {
    pub module_id: ModuleId,
    pub ctime: u16,
    pub tdc: u16,
    /// Baseline subtracted charge
    pub charge: i32,
    pub is_above_threshold: bool,
    /// Index of the RawDigit this was decoded from
    pub raw_digit: usize,
}

/// A hit whose default-mapped strip fell outside its plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRangeDigit {
    pub module_id: ModuleId,
    pub ctime: u16,
    pub tdc: u16,
    pub charge: i32,
    pub raw_digit: usize,
}

/// Trigger information and hit counts for one board entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventInfo {
    pub trigger_ctime: u32,
    pub trigger_utime: u32,
    pub window_start: u32,
    /// Trigger ctime of the previous board entry of the run
    pub previous_trigger_ctime: u32,
    pub n_rpc_hits: u32,
    pub n_scint_hits: u32,
    pub n_out_of_range: u32,
    /// Indices of the Digits of this entry
    pub digits: Vec<usize>,
    /// Indices of the OutOfRangeDigits of this entry
    pub out_of_range_digits: Vec<usize>,
}

/// Everything unpacked from one event.
///
/// Relations between the records are indices into the collections of the same UnpackedEvent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackedEvent {
    pub event_number: u32,
    pub digits: Vec<Digit>,
    pub out_of_range_digits: Vec<OutOfRangeDigit>,
    pub raw_digits: Vec<RawDigit>,
    pub event_infos: Vec<EventInfo>,
}

impl UnpackedEvent {
    pub fn new(event_number: u32) -> Self {
        Self {
            event_number,
            ..Default::default()
        }
    }

    pub fn raw_digit_of(&self, digit: &Digit) -> Option<&RawDigit> {
        self.raw_digits.get(digit.raw_digit)
    }

    pub fn raw_digit_of_out_of_range(&self, digit: &OutOfRangeDigit) -> Option<&RawDigit> {
        self.raw_digits.get(digit.raw_digit)
    }

    /// The Digits related to an EventInfo
    pub fn digits_of<'a>(&'a self, info: &'a EventInfo) -> impl Iterator<Item = &'a Digit> + 'a {
        info.digits.iter().filter_map(|idx| self.digits.get(*idx))
    }

    /// The OutOfRangeDigits related to an EventInfo
    pub fn out_of_range_digits_of<'a>(
        &'a self,
        info: &'a EventInfo,
    ) -> impl Iterator<Item = &'a OutOfRangeDigit> + 'a {
        info.out_of_range_digits
            .iter()
            .filter_map(|idx| self.out_of_range_digits.get(*idx))
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty() && self.out_of_range_digits.is_empty() && self.raw_digits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_data::encode_hit;

    #[test]
    fn test_raw_digit_fields() {
        let (word0, word1) = encode_hit(77, 1, 13, FLAG_RPC, 0xBEEF, 0x5A5, 0xABC);
        let raw = RawDigit::new(0x0700_0001, 2, word0, word1);
        assert_eq!(raw.channel(), 77);
        assert_eq!(raw.axis(), 1);
        assert_eq!(raw.lane(), 13);
        assert_eq!(raw.flag(), FLAG_RPC);
        assert_eq!(raw.ctime(), 0xBEEF);
        assert_eq!(raw.tdc(), 0x5A5);
        assert_eq!(raw.charge(), 0xABC);
        assert_eq!(raw.bword1, (word0 >> 16) as u16);
        assert_eq!(raw.bword4, (word1 & 0xFFFF) as u16);
    }

    #[test]
    fn test_extra_bits_ignored() {
        // bits above the tdc and charge fields carry nothing
        let raw = RawDigit::new(0, 0, 0, 0xF800_F000 | (12 << 16) | 34);
        assert_eq!(raw.tdc(), 12);
        assert_eq!(raw.charge(), 34);
    }
}
