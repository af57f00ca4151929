//! # bklm_unpacker
//!
//! bklm_unpacker is the raw data unpacker of the Belle II barrel KLM (BKLM), written in
//! Rust. It takes the hit words read out of the BKLM copper boards, maps every hit from its
//! electronics address to a detector strip, and writes the resulting digits to HDF5.
//!
//! ## Installation
//!
//! The only method of install is from source.
//!
//! ### HDF5
//!
//! Before building and running bklm_unpacker, HDF5 must be installed. Typically this will
//! be installed using a package manager (homebrew, apt, etc), and the Rust libraries will
//! auto detect the location of the HDF install. If HDF5 lives in a custom location, write
//! the following snippet into the file `.cargo/config.toml` in the repository:
//!
//! ```toml
//! [env]
//! HDF5_DIR="/path/to/my/hdf5/install/"
//!
//! [build]
//! rustflags="-C link-args=-Wl,-rpath,/path/to/my/hdf5/install/lib"
//! ```
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./bklm_unpacker_cli` from the top
//! level repository.
//!
//! ## Configuration
//!
//! The YAML format of a configuration file is as follows:
//!
//! ```yml
//! raw_path: None
//! hdf_path: None
//! channel_map_path: null
//! adc_threshold_path: null
//! first_run_number: 0
//! last_run_number: 0
//! n_threads: 1
//! unpacker:
//!   use_default_module_id: true
//!   keep_even_packages: false
//!   output_digits_name: BKLMDigits
//!   scintillator_threshold: 140.0
//!   load_threshold_from_db: true
//!   load_map_from_db: true
//! ```
//!
//! Raw files are expected at `raw_path/run_XXXX.bklm`. If `channel_map_path` is `null` the
//! channel map is empty and every hit goes through the default mapping (when enabled).
//!
//! ### Channel Map Format
//!
//! The channel map is a CSV file with a header line. The columns are as follows:
//!
//! ```csv
//! copper,slot,lane,axis,channel,sector,is_forward,layer,plane,strip
//! ```
//!
//! `copper` is the full board id (decimal or `0x` hex), `slot` counts from 1, and the
//! detector columns are one-based except for `plane` and `is_forward` (0 or 1).
//!
//! ### ADC Threshold Format
//!
//! ```yml
//! adc_offset: 3400
//! threshold: 140.0
//! ```
//!
//! ## Output
//!
//! ```text
//! run_0001.h5
//! events - min_event, max_event, version
//! |---- event_# - event_number
//! |    |---- BKLMDigits(dset)
//! |    |---- out_of_range(dset)
//! |    |---- raw(dset)
//! |    |---- info(dset)
//! ```
//!
//! Every digit and out of range row ends with `raw_index`, its row in `raw`, and `info_index`,
//! the row in `info` of the board entry it came from (-1 if none).
pub mod calibration;
pub mod channel_map;
pub mod config;
pub mod constants;
pub mod default_map;
pub mod diagnostics;
pub mod digit;
pub mod error;
pub mod hardware_id;
pub mod hdf_writer;
pub mod module_id;
pub mod process;
pub mod raw_data;
pub mod raw_file;
pub mod unpacker;
pub mod worker_status;
