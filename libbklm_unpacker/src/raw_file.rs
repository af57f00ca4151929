use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::constants::{MAX_SLOT_WORDS, NUMBER_OF_SLOTS, RAW_FILE_MAGIC, RAW_FILE_VERSION};
use super::error::RawFileError;
use super::raw_data::{BoardEntry, RawEvent, SlotBuffer};

// Structure (all words little endian u32)
// magic, version
// |---- event_number, n_entries
// |    |---- board_id, trigger_ctime, trigger_utime, window_start
// |    |    |---- word_count, words... (x4 slots)

/// Size of the file header in bytes
const HEADER_SIZE: u64 = 8;

/// Write the file header
pub fn write_file_header<W: Write>(writer: &mut W) -> Result<(), RawFileError> {
    writer.write_u32::<LittleEndian>(RAW_FILE_MAGIC)?;
    writer.write_u32::<LittleEndian>(RAW_FILE_VERSION)?;
    Ok(())
}

/// Read and check the file header
pub fn read_file_header<R: Read>(reader: &mut R) -> Result<(), RawFileError> {
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != RAW_FILE_MAGIC {
        return Err(RawFileError::BadMagic(magic));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != RAW_FILE_VERSION {
        return Err(RawFileError::BadVersion(version));
    }
    Ok(())
}

/// Write one event
pub fn write_raw_event<W: Write>(writer: &mut W, event: &RawEvent) -> Result<(), RawFileError> {
    writer.write_u32::<LittleEndian>(event.event_number)?;
    writer.write_u32::<LittleEndian>(event.entries.len() as u32)?;
    for entry in event.entries.iter() {
        writer.write_u32::<LittleEndian>(entry.board_id)?;
        writer.write_u32::<LittleEndian>(entry.trigger_ctime)?;
        writer.write_u32::<LittleEndian>(entry.trigger_utime)?;
        writer.write_u32::<LittleEndian>(entry.window_start)?;
        for slot in entry.slots.iter() {
            writer.write_u32::<LittleEndian>(slot.word_count() as u32)?;
            for word in slot.words.iter() {
                writer.write_u32::<LittleEndian>(*word)?;
            }
        }
    }
    Ok(())
}

/// Read one event.
///
/// Running out of data exactly at an event boundary is reported as `EndOfFile`. Running out in
/// the middle of an event is an IO error.
pub fn read_raw_event<R: Read>(reader: &mut R) -> Result<RawEvent, RawFileError> {
    let event_number = match reader.read_u32::<LittleEndian>() {
        Ok(number) => number,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(RawFileError::EndOfFile),
        Err(e) => return Err(RawFileError::IOError(e)),
    };
    let n_entries = reader.read_u32::<LittleEndian>()?;
    let mut entries: Vec<BoardEntry> = Vec::new();
    for _ in 0..n_entries {
        let mut entry = BoardEntry {
            board_id: reader.read_u32::<LittleEndian>()?,
            trigger_ctime: reader.read_u32::<LittleEndian>()?,
            trigger_utime: reader.read_u32::<LittleEndian>()?,
            window_start: reader.read_u32::<LittleEndian>()?,
            ..Default::default()
        };
        for slot in 0..NUMBER_OF_SLOTS {
            let word_count = reader.read_u32::<LittleEndian>()?;
            if word_count > MAX_SLOT_WORDS {
                return Err(RawFileError::CorruptWordCount(word_count));
            }
            let mut words = vec![0u32; word_count as usize];
            reader.read_u32_into::<LittleEndian>(&mut words)?;
            entry.slots[slot] = SlotBuffer::new(words);
        }
        entries.push(entry);
    }
    Ok(RawEvent {
        event_number,
        entries,
    })
}

/// Number of bytes an event takes up in a raw file
pub fn encoded_size(event: &RawEvent) -> u64 {
    let words: usize = event
        .entries
        .iter()
        .map(|entry| 4 + entry.slots.iter().map(|s| 1 + s.word_count()).sum::<usize>())
        .sum();
    (2 + words as u64) * 4
}

/// A BKLM raw data file, read one event at a time
#[derive(Debug)]
pub struct RawFile {
    file_handle: BufReader<File>,
    file_path: PathBuf,
    size_bytes: u64,
    bytes_read: u64,
}

impl RawFile {
    /// Open a raw file and check its header
    pub fn new(path: &Path) -> Result<Self, RawFileError> {
        if !path.exists() {
            return Err(RawFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        let mut file_handle = BufReader::new(file);
        read_file_header(&mut file_handle)?;

        Ok(Self {
            file_handle,
            file_path: path.to_path_buf(),
            size_bytes,
            bytes_read: HEADER_SIZE,
        })
    }

    /// Read the next event. Returns `RawFileError::EndOfFile` once the file is exhausted.
    pub fn get_next_event(&mut self) -> Result<RawEvent, RawFileError> {
        let event = read_raw_event(&mut self.file_handle)?;
        self.bytes_read += encoded_size(&event);
        Ok(event)
    }

    pub fn get_filename(&self) -> &Path {
        &self.file_path
    }

    pub fn get_size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn get_bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
