// The BKLM calibration describes every readout channel twice: once by where it sits in the
// electronics (copper board, finesse slot, lane, axis, channel) and once by where it sits in
// the detector (end, sector, layer, plane, strip). We map
// ElectronicsId key -> ModuleId
// where the key is the dense packing of the electronics address. The packing (including the
// offset of the copper id from BKLM_ID and the one-based slot) has to agree with what the
// unpacker computes from the raw data, otherwise nothing will ever be found.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;

use super::constants::{
    BKLM_ID, CHANNEL_MAP_COLUMNS, MAX_PACKED_LAYER, MAX_PACKED_STRIP, NUMBER_OF_BOARDS,
    NUMBER_OF_SECTORS, NUMBER_OF_SLOTS,
};
use super::error::{ChannelMapError, ChannelMapRowError};
use super::hardware_id::ElectronicsId;
use super::module_id::ModuleId;

/// One row of the BKLM electronics map, in the (mostly one-based) numbering of the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMapRow {
    /// Full node id of the copper board
    pub copper_id: u32,
    /// Finesse slot, one-based
    pub slot_id: u32,
    pub lane_id: u32,
    pub axis_id: u32,
    pub channel_id: u32,
    /// One-based
    pub sector: u32,
    pub is_forward: bool,
    /// One-based
    pub layer: u32,
    pub plane: u32,
    /// One-based
    pub strip_id: u32,
}

impl ChannelMapRow {
    /// Electronics address of this row, checked against the bit widths of the key
    pub fn electronics_id(&self) -> Result<ElectronicsId, ChannelMapRowError> {
        if self.copper_id < BKLM_ID || self.copper_id >= BKLM_ID + NUMBER_OF_BOARDS {
            return Err(ChannelMapRowError::BadCopperId(self.copper_id));
        }
        if self.slot_id < 1 || self.slot_id > NUMBER_OF_SLOTS as u32 {
            return Err(ChannelMapRowError::BadSlot(self.slot_id));
        }
        Ok(ElectronicsId::try_new(
            self.copper_id - BKLM_ID,
            self.slot_id - 1,
            self.lane_id,
            self.axis_id,
            self.channel_id,
        )?)
    }

    /// Detector address of this row, checked against the bit widths of the ModuleId
    pub fn module_id(&self) -> Result<ModuleId, ChannelMapRowError> {
        if self.sector < 1 || self.sector > NUMBER_OF_SECTORS as u32 {
            return Err(ChannelMapRowError::BadSector(self.sector));
        }
        if self.layer < 1 || self.layer > MAX_PACKED_LAYER as u32 {
            return Err(ChannelMapRowError::BadLayer(self.layer));
        }
        if self.plane > 1 {
            return Err(ChannelMapRowError::BadPlane(self.plane));
        }
        if self.strip_id < 1 || self.strip_id > MAX_PACKED_STRIP as u32 {
            return Err(ChannelMapRowError::BadStrip(self.strip_id));
        }
        Ok(ModuleId::from_one_based(
            self.is_forward,
            self.sector,
            self.layer,
            self.plane,
            self.strip_id,
        ))
    }

    /// Parse a row from a CSV line. Columns are in field order; is_forward is 0 or 1.
    fn from_csv_line(line: &str, line_number: usize) -> Result<Self, ChannelMapError> {
        let entries: Vec<&str> = line.split_terminator(',').map(str::trim).collect();
        if entries.len() != CHANNEL_MAP_COLUMNS {
            return Err(ChannelMapError::BadFileFormat(line_number));
        }
        let mut values = [0u32; CHANNEL_MAP_COLUMNS];
        for (value, entry) in values.iter_mut().zip(entries) {
            *value = entry.parse()?;
        }
        Ok(ChannelMapRow {
            copper_id: values[0],
            slot_id: values[1],
            lane_id: values[2],
            axis_id: values[3],
            channel_id: values[4],
            sector: values[5],
            is_forward: values[6] != 0,
            layer: values[7],
            plane: values[8],
            strip_id: values[9],
        })
    }
}

/// Read the rows of a channel map CSV file. The first line is a header and is skipped.
///
/// Copper ids may be given in decimal or as 0x-prefixed hexadecimal.
pub fn read_channel_map_rows(path: &Path) -> Result<Vec<ChannelMapRow>, ChannelMapError> {
    let mut contents = String::new();
    let mut file = File::open(path)?;
    file.read_to_string(&mut contents)?;
    parse_channel_map_rows(&contents)
}

fn parse_channel_map_rows(contents: &str) -> Result<Vec<ChannelMapRow>, ChannelMapError> {
    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let line = normalize_hex_copper(line);
        rows.push(ChannelMapRow::from_csv_line(&line, idx + 1)?);
    }
    Ok(rows)
}

// Board ids are conventionally written in hex; the other columns never are.
fn normalize_hex_copper(line: &str) -> String {
    match line.split_once(',') {
        Some((copper, rest)) => match copper.trim().strip_prefix("0x") {
            Some(hex) => match u32::from_str_radix(hex, 16) {
                Ok(value) => format!("{value},{rest}"),
                Err(_) => line.to_string(),
            },
            None => line.to_string(),
        },
        None => line.to_string(),
    }
}

/// ChannelMap contains the mapping of electronics addresses to BKLM module ids for one run.
///
/// The map is filled once at the start of a run and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    map: FxHashMap<u32, ModuleId>,
}

impl ChannelMap {
    /// Create a new ChannelMap from a CSV file.
    /// If the path is None the map is empty, and every channel goes through the default mapping.
    pub fn new(path: Option<&Path>) -> Result<Self, ChannelMapError> {
        match path {
            Some(p) => Ok(Self::from_rows(&read_channel_map_rows(p)?)),
            None => Ok(Self::default()),
        }
    }

    /// Build a fresh map from calibration rows
    pub fn from_rows(rows: &[ChannelMapRow]) -> Self {
        let mut map = Self::default();
        map.load(rows);
        map
    }

    /// Insert calibration rows, overwriting existing entries with the same address.
    ///
    /// Rows with fields outside their allowed range are skipped with a warning.
    pub fn load(&mut self, rows: &[ChannelMapRow]) {
        let mut n_skipped = 0;
        for row in rows {
            let entry = row
                .electronics_id()
                .and_then(|elect| Ok((elect, row.module_id()?)));
            match entry {
                Ok((elect, module)) => {
                    self.map.insert(elect.key(), module);
                }
                Err(e) => {
                    n_skipped += 1;
                    spdlog::warn!("Skipping channel map row {:?}: {}", row, e);
                }
            }
        }
        spdlog::debug!(
            "Loaded {} channel map rows ({} skipped); map has {} entries",
            rows.len() - n_skipped,
            n_skipped,
            self.map.len()
        );
    }

    /// Get the ModuleId of an electronics address.
    ///
    /// If returns None the address does not exist in the map
    pub fn get_module_id(&self, id: &ElectronicsId) -> Option<ModuleId> {
        self.map.get(&id.key()).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl PartialEq for ChannelMap {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(channel_id: u32, strip_id: u32) -> ChannelMapRow {
        ChannelMapRow {
            copper_id: BKLM_ID + 1,
            slot_id: 2,
            lane_id: 8,
            axis_id: 1,
            channel_id,
            sector: 4,
            is_forward: true,
            layer: 3,
            plane: 1,
            strip_id,
        }
    }

    #[test]
    fn test_lookup() {
        let map = ChannelMap::from_rows(&[make_row(7, 12)]);
        let elect = ElectronicsId::new(1, 1, 8, 1, 7);
        let expected = ModuleId::new(true, 3, 2, 1, 11);
        assert_eq!(map.get_module_id(&elect), Some(expected));
        assert_eq!(map.get_module_id(&ElectronicsId::new(1, 0, 8, 1, 7)), None);
    }

    #[test]
    fn test_load_twice_is_idempotent() {
        let rows = vec![make_row(1, 1), make_row(2, 2), make_row(3, 3)];
        let once = ChannelMap::from_rows(&rows);
        let mut twice = ChannelMap::from_rows(&rows);
        twice.load(&rows);
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 3);
    }

    #[test]
    fn test_last_row_wins() {
        let map = ChannelMap::from_rows(&[make_row(7, 12), make_row(7, 30)]);
        let elect = ElectronicsId::new(1, 1, 8, 1, 7);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_module_id(&elect).map(|m| m.strip()), Some(29));
    }

    #[test]
    fn test_bad_rows_skipped() {
        let mut bad_slot = make_row(1, 1);
        bad_slot.slot_id = 0;
        let bad_channel = make_row(64, 1);
        let mut bad_copper = make_row(2, 1);
        bad_copper.copper_id = 0x0800_0001;
        let bad_strip = make_row(3, 65);
        let map = ChannelMap::from_rows(&[
            bad_slot,
            bad_channel,
            bad_copper,
            bad_strip,
            make_row(4, 4),
        ]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_row_errors() {
        let mut row = make_row(1, 1);
        row.sector = 9;
        assert_eq!(row.module_id(), Err(ChannelMapRowError::BadSector(9)));
        row.sector = 1;
        row.layer = 17;
        assert_eq!(row.module_id(), Err(ChannelMapRowError::BadLayer(17)));
        let mut row = make_row(1, 1);
        row.lane_id = 32;
        assert!(matches!(
            row.electronics_id(),
            Err(ChannelMapRowError::BadElectronics(_))
        ));
    }

    #[test]
    fn test_parse_csv() {
        let contents = "copper,slot,lane,axis,channel,sector,forward,layer,plane,strip\n\
                        0x07000001,2,8,1,7,4,1,3,1,12\n\
                        \n\
                        117440515,1,1,0,5,3,0,1,1,9\n";
        let rows = parse_channel_map_rows(contents).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], make_row(7, 12));
        assert_eq!(rows[1].copper_id, BKLM_ID + 3);
        assert!(!rows[1].is_forward);
    }

    #[test]
    fn test_parse_csv_bad_format() {
        let contents = "header\n0x07000001,2,8,1,7\n";
        assert!(matches!(
            parse_channel_map_rows(contents),
            Err(ChannelMapError::BadFileFormat(2))
        ));
    }
}
