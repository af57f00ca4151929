use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::channel_map::ChannelMap;
use super::config::{Config, UnpackerConfig};
use super::constants::{DEFAULT_ADC_OFFSET, DEFAULT_SCINT_THRESHOLD};
use super::error::CalibrationError;

/// Scintillator ADC calibration: the baseline charges are subtracted from and the threshold
/// on the subtracted charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcThreshold {
    pub adc_offset: i32,
    pub threshold: f64,
}

impl Default for AdcThreshold {
    fn default() -> Self {
        Self {
            adc_offset: DEFAULT_ADC_OFFSET,
            threshold: DEFAULT_SCINT_THRESHOLD,
        }
    }
}

impl AdcThreshold {
    /// Read the ADC calibration from a YAML file
    pub fn read_file(path: &Path) -> Result<Self, CalibrationError> {
        if !path.exists() {
            return Err(CalibrationError::BadFilePath(path.to_path_buf()));
        }
        let yaml_str = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }
}

/// Everything the unpacker needs from the calibration for one run.
///
/// The channel map is shared, so one RunCalibration can be handed to several unpackers.
#[derive(Debug, Clone, Default)]
pub struct RunCalibration {
    pub channel_map: Arc<ChannelMap>,
    pub adc_threshold: AdcThreshold,
}

impl RunCalibration {
    pub fn new(channel_map: ChannelMap, adc_threshold: AdcThreshold) -> Self {
        Self {
            channel_map: Arc::new(channel_map),
            adc_threshold,
        }
    }

    /// Load the calibration files named in the config.
    ///
    /// Files which the unpacker config says not to use are not read.
    pub fn load(config: &Config) -> Result<Self, CalibrationError> {
        let channel_map = if config.unpacker.load_map_from_db {
            ChannelMap::new(config.channel_map_path.as_deref())?
        } else {
            ChannelMap::default()
        };
        let adc_threshold = match config.adc_threshold_path.as_deref() {
            Some(path) if config.unpacker.load_threshold_from_db => AdcThreshold::read_file(path)?,
            _ => AdcThreshold::default(),
        };
        Ok(Self::new(channel_map, adc_threshold))
    }

    /// Apply the unpacker config: drop what the config says not to use
    pub fn resolve(&self, config: &UnpackerConfig) -> Self {
        let channel_map = if config.load_map_from_db {
            self.channel_map.clone()
        } else {
            Arc::new(ChannelMap::default())
        };
        let adc_threshold = if config.load_threshold_from_db {
            self.adc_threshold
        } else {
            AdcThreshold {
                adc_offset: DEFAULT_ADC_OFFSET,
                threshold: config.scintillator_threshold,
            }
        };
        Self {
            channel_map,
            adc_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_map::ChannelMapRow;
    use crate::constants::BKLM_ID;

    fn one_row_map() -> ChannelMap {
        ChannelMap::from_rows(&[ChannelMapRow {
            copper_id: BKLM_ID,
            slot_id: 1,
            lane_id: 1,
            axis_id: 0,
            channel_id: 5,
            sector: 2,
            is_forward: true,
            layer: 3,
            plane: 0,
            strip_id: 10,
        }])
    }

    #[test]
    fn test_resolve_keeps_calibration() {
        let calib = RunCalibration::new(
            one_row_map(),
            AdcThreshold {
                adc_offset: 3000,
                threshold: 90.0,
            },
        );
        let resolved = calib.resolve(&UnpackerConfig::default());
        assert_eq!(resolved.channel_map.len(), 1);
        assert!(Arc::ptr_eq(&resolved.channel_map, &calib.channel_map));
        assert_eq!(resolved.adc_threshold.adc_offset, 3000);
    }

    #[test]
    fn test_resolve_ignores_calibration() {
        let calib = RunCalibration::new(
            one_row_map(),
            AdcThreshold {
                adc_offset: 3000,
                threshold: 90.0,
            },
        );
        let config = UnpackerConfig {
            load_map_from_db: false,
            load_threshold_from_db: false,
            scintillator_threshold: 150.0,
            ..Default::default()
        };
        let resolved = calib.resolve(&config);
        assert!(resolved.channel_map.is_empty());
        assert_eq!(
            resolved.adc_threshold,
            AdcThreshold {
                adc_offset: DEFAULT_ADC_OFFSET,
                threshold: 150.0
            }
        );
    }

    #[test]
    fn test_adc_threshold_yaml() {
        let threshold: AdcThreshold =
            serde_yaml::from_str("adc_offset: 3350\nthreshold: 120.5\n").unwrap();
        assert_eq!(threshold.adc_offset, 3350);
        assert_eq!(threshold.threshold, 120.5);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AdcThreshold::read_file(Path::new("/does/not/exist.yml")),
            Err(CalibrationError::BadFilePath(_))
        ));
    }
}
