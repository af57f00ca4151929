use std::fmt;

use fxhash::FxHashMap;

use super::constants::LOGGED_OCCURRENCES;

/// Reasons for the unpacker to throw away data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// Slot word count is even and non-zero
    MalformedSlot,
    /// No channel map entry and the default mapping is disabled
    UnmappedChannel,
    /// Layer past the last BKLM layer
    InvalidLayer,
    /// Default mapping requested for a board without a sector assignment
    UnknownCopper,
    /// Board id outside the BKLM range
    BoardOutOfRange,
}

impl DropReason {
    /// Whether individual occurrences are worth a log line
    pub fn is_logged(&self) -> bool {
        !matches!(self, Self::BoardOutOfRange)
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::MalformedSlot => "slot word count is not a whole number of hits plus a trailer",
            Self::UnmappedChannel => "channel is not in the channel map",
            Self::InvalidLayer => "hit has an invalid layer",
            Self::UnknownCopper => "board has no default mapping",
            Self::BoardOutOfRange => "board id is not a BKLM board",
        };
        write!(f, "{message}")
    }
}

/// Per-run counters of dropped data.
///
/// The first few occurrences of each reason are logged as warnings, after that they are only
/// counted. Reset at the start of every run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    counts: FxHashMap<DropReason, u64>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Count a drop. `detail` is only evaluated when the occurrence gets logged.
    pub fn record<F: FnOnce() -> String>(&mut self, reason: DropReason, detail: F) {
        let count = self.counts.entry(reason).or_insert(0);
        *count += 1;
        if !reason.is_logged() {
            return;
        }
        if *count <= LOGGED_OCCURRENCES {
            spdlog::warn!("Dropping data, {}: {}", reason, detail());
        }
        if *count == LOGGED_OCCURRENCES {
            spdlog::warn!(
                "Suppressing further messages for '{}' this run; they are still counted",
                reason
            );
        }
    }

    pub fn count(&self, reason: DropReason) -> u64 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Log every reason seen this run with its total count
    pub fn log_summary(&self) {
        if self.counts.is_empty() {
            spdlog::info!("No data was dropped this run");
            return;
        }
        let mut reasons: Vec<(&DropReason, &u64)> = self.counts.iter().collect();
        reasons.sort();
        for (reason, count) in reasons {
            spdlog::info!("'{}' occurred {} times", reason, count);
        }
    }
}
