use std::path::PathBuf;
use thiserror::Error;

use super::constants::*;
use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectronicsIdError {
    #[error("Copper index {0} does not fit in 4 bits")]
    BadCopper(u32),
    #[error("Finesse {0} does not fit in 2 bits")]
    BadFinesse(u32),
    #[error("Lane {0} does not fit in 5 bits")]
    BadLane(u32),
    #[error("Axis {0} is neither 0 nor 1")]
    BadAxis(u32),
    #[error("Channel {0} does not fit in 6 bits")]
    BadChannel(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelMapRowError {
    #[error("Bad electronics address in channel map row: {0}")]
    BadElectronics(#[from] ElectronicsIdError),
    #[error("Copper id {0:#x} is not a BKLM board")]
    BadCopperId(u32),
    #[error("Slot id {0} is outside 1..=4")]
    BadSlot(u32),
    #[error("Sector {0} is outside 1..={max}", max=NUMBER_OF_SECTORS)]
    BadSector(u32),
    #[error("Layer {0} is outside 1..={max}", max=MAX_PACKED_LAYER)]
    BadLayer(u32),
    #[error("Plane {0} is neither 0 nor 1")]
    BadPlane(u32),
    #[error("Strip {0} is outside 1..={max}", max=MAX_PACKED_STRIP)]
    BadStrip(u32),
}

#[derive(Debug, Error)]
pub enum ChannelMapError {
    #[error("ChannelMap failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ChannelMap failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("ChannelMap was given a file with the incorrect format; expected {exp} columns on line {0}", exp=CHANNEL_MAP_COLUMNS)]
    BadFileFormat(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefaultMapError {
    #[error("Board {0:#x} has no default sector assignment")]
    UnknownCopper(u32),
    #[error("Lane {lane} gives layer {layer}, which cannot be packed into a module id")]
    InvalidLayer { lane: u8, layer: i32 },
}

#[derive(Debug, Error)]
pub enum RawFileError {
    #[error("Could not open raw file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Incorrect magic {0:#010x} found in raw file header; expected {exp:#010x}", exp=RAW_FILE_MAGIC)]
    BadMagic(u32),
    #[error("Unsupported raw file version {0}; expected {exp}", exp=RAW_FILE_VERSION)]
    BadVersion(u32),
    #[error("Slot word count {0} exceeds the limit of {max}", max=MAX_SLOT_WORDS)]
    CorruptWordCount(u32),
    #[error("Reached end of raw file")]
    EndOfFile,
    #[error("Raw file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Failed to load calibration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Calibration failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Calibration failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Calibration failed due to ChannelMap error: {0}")]
    MapError(#[from] ChannelMapError),
}

#[derive(Debug, Error)]
pub enum HDF5WriterError {
    #[error("HDF5Writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("HDF5Writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("HDF5Writer could not build a data matrix: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("HDF5Writer could not encode a string attribute: {0}")]
    StringError(#[from] hdf5::types::StringError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to RawFile error: {0}")]
    RawFileError(#[from] RawFileError),
    #[error("Processor failed due to Calibration error: {0}")]
    CalibrationError(#[from] CalibrationError),
    #[error("Processor failed due to HDF5Writer error: {0}")]
    HDFError(#[from] HDF5WriterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
