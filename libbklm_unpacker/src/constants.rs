/// Node id of the first BKLM copper board; every BKLM board id is this plus a small index
pub const BKLM_ID: u32 = 0x0700_0000;
/// Number of consecutive board ids, starting at BKLM_ID, which belong to the BKLM
pub const NUMBER_OF_BOARDS: u32 = 5;
/// Number of finesse slots on each copper board
pub const NUMBER_OF_SLOTS: usize = 4;
/// Number of 32-bit words making up one hit
pub const HIT_WORD_LENGTH: usize = 2;

/// Largest valid zero-based layer
pub const MAX_LAYER_INDEX: u32 = 14;
/// Number of sectors in each end of the barrel
pub const NUMBER_OF_SECTORS: u8 = 8;
/// Largest one-based layer which fits in a ModuleId
pub const MAX_PACKED_LAYER: i32 = 16;
/// Largest one-based strip which fits in a ModuleId
pub const MAX_PACKED_STRIP: u16 = 64;

/// Scintillator charge threshold used when the calibration is not consulted
pub const DEFAULT_SCINT_THRESHOLD: f64 = 140.0;
/// Scintillator ADC baseline used when the calibration is not consulted
pub const DEFAULT_ADC_OFFSET: i32 = 3400;
/// Default name of the accepted digit collection
pub const DEFAULT_DIGITS_NAME: &str = "BKLMDigits";

/// Each drop reason is logged this many times per run before going quiet
pub const LOGGED_OCCURRENCES: u64 = 10;

/// Raw file magic, "BKLM" read as a little endian word
pub const RAW_FILE_MAGIC: u32 = 0x4D4C_4B42;
pub const RAW_FILE_VERSION: u32 = 1;
/// Upper bound on a single slot's word count in a raw file. Anything larger is corrupt.
pub const MAX_SLOT_WORDS: u32 = 1 << 20;

/// Number of columns in a channel map CSV row
pub const CHANNEL_MAP_COLUMNS: usize = 10;
