use super::calibration::RunCalibration;
use super::config::UnpackerConfig;
use super::constants::{BKLM_ID, MAX_LAYER_INDEX, NUMBER_OF_BOARDS};
use super::default_map::default_module_id;
use super::diagnostics::{Diagnostics, DropReason};
use super::digit::{Digit, EventInfo, OutOfRangeDigit, RawDigit, UnpackedEvent};
use super::error::DefaultMapError;
use super::hardware_id::ElectronicsId;
use super::module_id::ModuleId;
use super::raw_data::{BoardEntry, RawEvent};

/// Check if a board id belongs to the BKLM readout
pub fn is_bklm_board(board_id: u32) -> bool {
    (BKLM_ID..BKLM_ID + NUMBER_OF_BOARDS).contains(&board_id)
}

/// Unpacker turns BKLM raw data into Digits.
///
/// An Unpacker is driven run by run: [`begin_run`](Unpacker::begin_run) hands it the calibration
/// of the run, [`unpack_event`](Unpacker::unpack_event) is called once per event, and
/// [`end_run`](Unpacker::end_run) reports what had to be dropped. Malformed data never stops the
/// unpacking; it is dropped and counted in the [`Diagnostics`].
///
/// The only state carried from one event to the next is the trigger ctime of the previous board
/// entry and the drop counters, both reset by `begin_run`.
#[derive(Debug)]
pub struct Unpacker {
    config: UnpackerConfig,
    calibration: RunCalibration,
    previous_trigger_ctime: u32,
    diagnostics: Diagnostics,
    n_events: u64,
}

impl Unpacker {
    /// Create a new Unpacker. Until `begin_run` is called the channel map is empty.
    pub fn new(config: UnpackerConfig) -> Self {
        let calibration = RunCalibration::default().resolve(&config);
        Unpacker {
            config,
            calibration,
            previous_trigger_ctime: 0,
            diagnostics: Diagnostics::new(),
            n_events: 0,
        }
    }

    pub fn config(&self) -> &UnpackerConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Start a new run with the given calibration, resetting all run state
    pub fn begin_run(&mut self, calibration: &RunCalibration) {
        self.calibration = calibration.resolve(&self.config);
        self.previous_trigger_ctime = 0;
        self.diagnostics.reset();
        self.n_events = 0;

        if self.calibration.channel_map.is_empty() {
            if self.config.use_default_module_id {
                spdlog::info!("Channel map is empty; all channels will use the default mapping");
            } else {
                spdlog::warn!(
                    "Channel map is empty and the default mapping is disabled; every hit will be dropped"
                );
            }
        }
        spdlog::debug!(
            "Unpacker run start: {} mapped channels, ADC offset {}, threshold {}",
            self.calibration.channel_map.len(),
            self.calibration.adc_threshold.adc_offset,
            self.calibration.adc_threshold.threshold
        );
    }

    /// Report the drop counters of the run
    pub fn end_run(&self) {
        spdlog::info!("Unpacked {} events", self.n_events);
        self.diagnostics.log_summary();
    }

    /// Unpack all board entries of one event
    pub fn unpack_event(&mut self, event: &RawEvent) -> UnpackedEvent {
        let mut unpacked = UnpackedEvent::new(event.event_number);
        for entry in event.entries.iter() {
            self.unpack_entry(entry, &mut unpacked);
        }
        self.n_events += 1;
        unpacked
    }

    fn unpack_entry(&mut self, entry: &BoardEntry, unpacked: &mut UnpackedEvent) {
        let info_index = unpacked.event_infos.len();
        unpacked.event_infos.push(EventInfo {
            trigger_ctime: entry.trigger_ctime,
            trigger_utime: entry.trigger_utime,
            window_start: entry.window_start,
            previous_trigger_ctime: self.previous_trigger_ctime,
            ..Default::default()
        });
        self.previous_trigger_ctime = entry.trigger_ctime;

        if !is_bklm_board(entry.board_id) {
            self.diagnostics
                .record(DropReason::BoardOutOfRange, || format!("{:#x}", entry.board_id));
            return;
        }

        for (slot, buffer) in entry.slots.iter().enumerate() {
            if !buffer.is_well_framed() && !self.config.keep_even_packages {
                self.diagnostics.record(DropReason::MalformedSlot, || {
                    format!(
                        "board {:#x} slot {} has {} words",
                        entry.board_id,
                        slot,
                        buffer.word_count()
                    )
                });
                continue;
            }
            for (word0, word1) in buffer.hits() {
                let raw = RawDigit::new(entry.board_id, slot as u8, word0, word1);
                self.unpack_hit(raw, info_index, unpacked);
            }
        }
    }

    /// Resolve the ModuleId of a hit. None means the hit is dropped.
    fn map_hit(&mut self, raw: &RawDigit) -> Option<(ModuleId, bool)> {
        let elect = ElectronicsId::new(
            raw.board_id - BKLM_ID,
            raw.slot as u32,
            raw.lane() as u32,
            raw.axis() as u32,
            raw.channel() as u32,
        );
        if let Some(module_id) = self.calibration.channel_map.get_module_id(&elect) {
            return Some((module_id, false));
        }

        if !self.config.use_default_module_id {
            self.diagnostics
                .record(DropReason::UnmappedChannel, || format!("{:?}", elect));
            return None;
        }

        match default_module_id(
            raw.board_id,
            raw.slot,
            raw.lane() as u8,
            raw.axis() as u8,
            raw.channel(),
        ) {
            Ok(mapping) => Some((mapping.module_id, mapping.out_of_range)),
            Err(e @ DefaultMapError::UnknownCopper(_)) => {
                self.diagnostics
                    .record(DropReason::UnknownCopper, || e.to_string());
                None
            }
            Err(e @ DefaultMapError::InvalidLayer { .. }) => {
                self.diagnostics
                    .record(DropReason::InvalidLayer, || e.to_string());
                None
            }
        }
    }

    fn unpack_hit(&mut self, raw: RawDigit, info_index: usize, unpacked: &mut UnpackedEvent) {
        let raw_index = unpacked.raw_digits.len();
        unpacked.raw_digits.push(raw);

        let (module_id, out_of_range) = match self.map_hit(&raw) {
            Some(mapped) => mapped,
            None => return,
        };

        if module_id.layer() > MAX_LAYER_INDEX {
            self.diagnostics.record(DropReason::InvalidLayer, || {
                format!("layer {} in {}", module_id.layer(), module_id)
            });
            return;
        }

        let charge = self.calibration.adc_threshold.adc_offset - raw.charge() as i32;
        let info = &mut unpacked.event_infos[info_index];

        if out_of_range {
            info.n_out_of_range += 1;
            info.out_of_range_digits
                .push(unpacked.out_of_range_digits.len());
            unpacked.out_of_range_digits.push(OutOfRangeDigit {
                module_id,
                ctime: raw.ctime(),
                tdc: raw.tdc(),
                charge,
                raw_digit: raw_index,
            });
            return;
        }

        let is_in_rpc = module_id.layer() > 1;
        let module_id = if is_in_rpc {
            info.n_rpc_hits += 1;
            module_id.with_in_rpc()
        } else {
            info.n_scint_hits += 1;
            module_id
        };
        let is_above_threshold =
            !is_in_rpc && charge as f64 > self.calibration.adc_threshold.threshold;

        info.digits.push(unpacked.digits.len());
        unpacked.digits.push(Digit {
            module_id,
            ctime: raw.ctime(),
            tdc: raw.tdc(),
            charge,
            is_above_threshold,
            raw_digit: raw_index,
        });
    }
}
