//! # bklm_unpacker_cli
//!
//! Part of the bklm_unpacker crate family.
//!
//! This is the command line application to unpack BKLM raw data.
//!
//! ## Install
//!
//! Use `cargo install --path ./bklm_unpacker_cli`
//!
//! ## Use
//!
//! Make a template configuration with
//!
//! ```bash
//! bklm_unpacker_cli -p config.yml new
//! ```
//!
//! fill it out, and then unpack the runs with
//!
//! ```bash
//! bklm_unpacker_cli -p config.yml
//! ```
//!
//! Detailed messages go to `bklm_unpacker.log` in the working directory.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libbklm_unpacker::config::Config;
use libbklm_unpacker::error::ConfigError;
use libbklm_unpacker::process::{create_subsets, process_subset};
use libbklm_unpacker::worker_status::{WorkerPhase, WorkerStatus};

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

/// Send the library's log messages to a file
fn init_file_logger() -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./bklm_unpacker.log"))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("bklm_unpacker_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("{e}"),
        }
        return;
    }

    if let Err(e) = init_file_logger() {
        log::warn!("Could not create the log file, detailed messages will be lost: {e}");
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if !config.is_n_threads_valid() {
        log::error!("Number of threads must be at least 1, got {}", config.n_threads);
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("Raw Path: {}", config.raw_path.to_string_lossy());
    log::info!("HDF5 Path: {}", config.hdf_path.to_string_lossy());
    match &config.channel_map_path {
        Some(path) => log::info!("Channel Map Path: {}", path.to_string_lossy()),
        None => log::info!("Channel Map Path: None"),
    }
    match &config.adc_threshold_path {
        Some(path) => log::info!("ADC Threshold Path: {}", path.to_string_lossy()),
        None => log::info!("ADC Threshold Path: None"),
    }
    log::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );
    log::info!(
        "Default Mapping: {} Keep Even Packages: {}",
        config.unpacker.use_default_module_id,
        config.unpacker.keep_even_packages
    );

    // Spawn the workers, one progress bar each
    let style = ProgressStyle::with_template("Worker {prefix} [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let mut workers = Vec::new();
    let mut bars: Vec<Option<ProgressBar>> = Vec::new();
    for (idx, subset) in create_subsets(&config).into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            bars.push(None);
            continue;
        }
        let pb = pb_manager.add(ProgressBar::new(100));
        pb.set_style(style.clone());
        pb.set_prefix(format!("{idx}"));
        bars.push(Some(pb));

        let conf = config.clone();
        let worker_tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, worker_tx, idx, subset)
        }));
    }
    // Only the workers hold senders now, the loop below ends when they all finish
    drop(tx);

    for status in rx.iter() {
        if let Some(Some(pb)) = bars.get(status.worker_id) {
            pb.set_position((status.progress * 100.0) as u64);
            match status.phase {
                WorkerPhase::Unpacking => pb.set_message(format!("run {}", status.run_number)),
                WorkerPhase::Done => pb.set_message(format!("run {} done", status.run_number)),
            }
        }
    }

    let mut n_failed = 0;
    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => {
                n_failed += 1;
                log::error!("Unpacking failed with error: {e}");
            }
            Err(_) => {
                n_failed += 1;
                log::error!("An error occured joining one of the workers!");
            }
        }
    }
    for pb in bars.into_iter().flatten() {
        pb.finish();
    }

    if n_failed == 0 {
        log::info!("Successfully unpacked data!");
    } else {
        log::error!("{n_failed} worker(s) failed, check bklm_unpacker.log for details.");
    }
    log::info!("Done.");
}
