use std::sync::mpsc::Sender;

use super::calibration::RunCalibration;
use super::config::Config;
use super::error::{ProcessorError, RawFileError};
use super::hdf_writer::HDFWriter;
use super::raw_file::RawFile;
use super::unpacker::Unpacker;
use super::worker_status::{WorkerPhase, WorkerStatus};

/// The main loop of bklm_unpacker.
///
/// This takes in a config (and progress monitor) and unpacks every event of the run's raw file
/// into the HDF5 output.
pub fn process_run(
    config: &Config,
    run_number: i32,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let raw_path = config.get_raw_file_name(run_number)?;
    let hdf_path = config.get_hdf_file_name(run_number)?;

    let calibration = RunCalibration::load(config)?;
    let mut unpacker = Unpacker::new(config.unpacker.clone());
    unpacker.begin_run(&calibration);

    let mut raw_file = RawFile::new(&raw_path)?;
    spdlog::info!("Reading raw file {}", raw_file.get_filename().display());
    let mut writer = HDFWriter::new(&hdf_path, &config.unpacker.output_digits_name)?;
    let total_data_size = raw_file.get_size_bytes();
    spdlog::info!(
        "Total run size: {}",
        human_bytes::human_bytes(total_data_size as f64)
    );

    let flush_frac: f32 = 0.01;
    let flush_val = (total_data_size as f64 * flush_frac as f64) as u64;
    let mut count: u64 = 0;
    let mut last_bytes_read = raw_file.get_bytes_read();
    let mut progress: f32 = 0.0;
    let mut event_counter: u64 = 0;

    tx.send(WorkerStatus::new(
        0.0,
        run_number,
        *worker_id,
        WorkerPhase::Unpacking,
    ))?;
    loop {
        let event = match raw_file.get_next_event() {
            Ok(event) => event,
            Err(RawFileError::EndOfFile) => break,
            Err(e) => return Err(ProcessorError::RawFileError(e)),
        };

        count += raw_file.get_bytes_read() - last_bytes_read;
        last_bytes_read = raw_file.get_bytes_read();
        if count > flush_val {
            count = 0;
            progress += flush_frac;
            tx.send(WorkerStatus::new(
                progress,
                run_number,
                *worker_id,
                WorkerPhase::Unpacking,
            ))?;
        }

        let unpacked = unpacker.unpack_event(&event);
        writer.write_event(&unpacked, &event_counter)?;
        event_counter += 1;
    }

    unpacker.end_run();
    writer.close()?;

    tx.send(WorkerStatus::new(
        1.0,
        run_number,
        *worker_id,
        WorkerPhase::Done,
    ))?;
    spdlog::info!("Done with raw data.");
    Ok(())
}

/// Process a subset of runs
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<i32>,
) -> Result<(), ProcessorError> {
    for run in subset {
        if config.does_run_exist(run) {
            spdlog::info!("Processing run {}...", run);
            process_run(&config, run, &tx, &worker_id)?;
            spdlog::info!("Finished processing run {}.", run);
        } else {
            spdlog::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Divide a run range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<i32>> {
    let mut subsets: Vec<Vec<i32>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, run) in (config.first_run_number..(config.last_run_number + 1)).enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}
