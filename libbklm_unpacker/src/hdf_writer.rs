use hdf5::types::VarLenUnicode;
use hdf5::File;
use ndarray::Array2;
use std::path::Path;
use std::str::FromStr;

use super::digit::UnpackedEvent;
use super::error::HDF5WriterError;

const EVENTS_NAME: &str = "events";
const OUT_OF_RANGE_NAME: &str = "out_of_range";
const RAW_NAME: &str = "raw";
const INFO_NAME: &str = "info";

const DIGIT_COLUMNS: usize = 12;
const OUT_OF_RANGE_COLUMNS: usize = 10;
const RAW_COLUMNS: usize = 6;
const INFO_COLUMNS: usize = 7;

/// This is the version of the output format
const FORMAT_VERSION: &str = "1.0";

/// A simple struct which wraps around the hdf5-rust library.
///
/// Opens an HDF5 file for writing unpacked events. Module id fields are written zero-based, as
/// they are packed. `raw_index` and `info_index` are rows of the event's raw and info datasets,
/// -1 when the record has no such relation.
#[derive(Debug)]
pub struct HDFWriter {
    file_handle: File,
    events_group: hdf5::Group,
    digits_name: String,
    first_event: Option<u64>,
    last_event: u64,
    n_written: u64,
}
// Structure
// events - min_event, max_event, version
// |---- event_# - event_number
// |    |---- <digits_name>(dset) - forward, sector, layer, plane, strip, in_rpc, ctime, tdc, charge, above_threshold, raw_index, info_index
// |    |---- out_of_range(dset) - forward, sector, layer, plane, strip, ctime, tdc, charge, raw_index, info_index
// |    |---- raw(dset) - board, slot, bword1, bword2, bword3, bword4
// |    |---- info(dset) - trigger_ctime, trigger_utime, window_start, previous_ctime, n_rpc, n_scint, n_out_of_range

impl HDFWriter {
    /// Create the writer, opening a file at path and creating the events group
    pub fn new(path: &Path, digits_name: &str) -> Result<Self, HDF5WriterError> {
        let file_handle = File::create(path)?;
        let unpacker_version = format!("{}:{}", env!("CARGO_PKG_NAME"), FORMAT_VERSION);

        let events_group = file_handle.create_group(EVENTS_NAME)?;
        events_group.new_attr::<u64>().create("min_event")?;
        events_group.new_attr::<u64>().create("max_event")?;
        events_group
            .new_attr::<VarLenUnicode>()
            .create("version")?
            .write_scalar(&VarLenUnicode::from_str(&unpacker_version)?)?;

        Ok(Self {
            file_handle,
            events_group,
            digits_name: digits_name.to_string(),
            first_event: None,
            last_event: 0,
            n_written: 0,
        })
    }

    /// Write an event, where each collection is converted into a data matrix
    pub fn write_event(
        &mut self,
        event: &UnpackedEvent,
        event_counter: &u64,
    ) -> Result<(), HDF5WriterError> {
        if self.first_event.is_none() {
            self.first_event = Some(*event_counter);
        }
        if *event_counter > self.last_event {
            self.last_event = *event_counter;
        }
        self.n_written += 1;

        let event_group = self
            .events_group
            .create_group(&format!("event_{}", event_counter))?;
        event_group
            .new_attr::<u32>()
            .create("event_number")?
            .write_scalar(&event.event_number)?;

        event_group
            .new_dataset_builder()
            .with_data(&digit_matrix(event)?)
            .create(self.digits_name.as_str())?;
        event_group
            .new_dataset_builder()
            .with_data(&out_of_range_matrix(event)?)
            .create(OUT_OF_RANGE_NAME)?;
        event_group
            .new_dataset_builder()
            .with_data(&raw_matrix(event)?)
            .create(RAW_NAME)?;
        event_group
            .new_dataset_builder()
            .with_data(&info_matrix(event)?)
            .create(INFO_NAME)?;

        Ok(())
    }

    /// Write meta information on first and last events, consume the writer
    pub fn close(self) -> Result<(), HDF5WriterError> {
        self.events_group
            .attr("min_event")?
            .write_scalar(&self.first_event.unwrap_or(0))?;
        self.events_group
            .attr("max_event")?
            .write_scalar(&self.last_event)?;
        spdlog::info!("{} events written.", self.n_written);
        self.file_handle.close()?;
        Ok(())
    }
}

/// For each record of a collection, the row of the EventInfo which lists it
fn info_indices<'a>(n_records: usize, lists: impl Iterator<Item = &'a Vec<usize>>) -> Vec<i32> {
    let mut indices = vec![-1; n_records];
    for (info_idx, list) in lists.enumerate() {
        for record in list {
            if let Some(index) = indices.get_mut(*record) {
                *index = info_idx as i32;
            }
        }
    }
    indices
}

fn digit_matrix(event: &UnpackedEvent) -> Result<Array2<i32>, HDF5WriterError> {
    let info_index = info_indices(
        event.digits.len(),
        event.event_infos.iter().map(|info| &info.digits),
    );
    let mut data: Vec<i32> = Vec::with_capacity(event.digits.len() * DIGIT_COLUMNS);
    for (digit, info_idx) in event.digits.iter().zip(info_index) {
        let id = digit.module_id;
        data.extend_from_slice(&[
            id.is_forward() as i32,
            id.sector() as i32,
            id.layer() as i32,
            id.plane() as i32,
            id.strip() as i32,
            id.is_in_rpc() as i32,
            digit.ctime as i32,
            digit.tdc as i32,
            digit.charge,
            digit.is_above_threshold as i32,
            digit.raw_digit as i32,
            info_idx,
        ]);
    }
    Ok(Array2::from_shape_vec(
        (event.digits.len(), DIGIT_COLUMNS),
        data,
    )?)
}

fn out_of_range_matrix(event: &UnpackedEvent) -> Result<Array2<i32>, HDF5WriterError> {
    let info_index = info_indices(
        event.out_of_range_digits.len(),
        event.event_infos.iter().map(|info| &info.out_of_range_digits),
    );
    let mut data: Vec<i32> =
        Vec::with_capacity(event.out_of_range_digits.len() * OUT_OF_RANGE_COLUMNS);
    for (digit, info_idx) in event.out_of_range_digits.iter().zip(info_index) {
        let id = digit.module_id;
        data.extend_from_slice(&[
            id.is_forward() as i32,
            id.sector() as i32,
            id.layer() as i32,
            id.plane() as i32,
            id.strip() as i32,
            digit.ctime as i32,
            digit.tdc as i32,
            digit.charge,
            digit.raw_digit as i32,
            info_idx,
        ]);
    }
    Ok(Array2::from_shape_vec(
        (event.out_of_range_digits.len(), OUT_OF_RANGE_COLUMNS),
        data,
    )?)
}

fn raw_matrix(event: &UnpackedEvent) -> Result<Array2<u32>, HDF5WriterError> {
    let mut data: Vec<u32> = Vec::with_capacity(event.raw_digits.len() * RAW_COLUMNS);
    for raw in event.raw_digits.iter() {
        data.extend_from_slice(&[
            raw.board_id,
            raw.slot as u32,
            raw.bword1 as u32,
            raw.bword2 as u32,
            raw.bword3 as u32,
            raw.bword4 as u32,
        ]);
    }
    Ok(Array2::from_shape_vec(
        (event.raw_digits.len(), RAW_COLUMNS),
        data,
    )?)
}

fn info_matrix(event: &UnpackedEvent) -> Result<Array2<u32>, HDF5WriterError> {
    let mut data: Vec<u32> = Vec::with_capacity(event.event_infos.len() * INFO_COLUMNS);
    for info in event.event_infos.iter() {
        data.extend_from_slice(&[
            info.trigger_ctime,
            info.trigger_utime,
            info.window_start,
            info.previous_trigger_ctime,
            info.n_rpc_hits,
            info.n_scint_hits,
            info.n_out_of_range,
        ]);
    }
    Ok(Array2::from_shape_vec(
        (event.event_infos.len(), INFO_COLUMNS),
        data,
    )?)
}
