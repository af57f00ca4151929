use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::{DEFAULT_DIGITS_NAME, DEFAULT_SCINT_THRESHOLD};
use super::error::ConfigError;

/// Options of the unpacker itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackerConfig {
    /// Map channels missing from the channel map with the default mapping instead of dropping them
    pub use_default_module_id: bool,
    /// Unpack slots with an even word count instead of skipping them
    pub keep_even_packages: bool,
    /// Name of the accepted digit collection in the output
    pub output_digits_name: String,
    /// Scintillator threshold used when load_threshold_from_db is false
    pub scintillator_threshold: f64,
    /// Take the threshold and ADC offset from the ADC calibration
    pub load_threshold_from_db: bool,
    /// Use the channel map calibration. If false every channel is default mapped.
    pub load_map_from_db: bool,
}

impl Default for UnpackerConfig {
    fn default() -> Self {
        Self {
            use_default_module_id: true,
            keep_even_packages: false,
            output_digits_name: String::from(DEFAULT_DIGITS_NAME),
            scintillator_threshold: DEFAULT_SCINT_THRESHOLD,
            load_threshold_from_db: true,
            load_map_from_db: true,
        }
    }
}

/// Structure representing the application configuration. Contains pathing and run information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    pub hdf_path: PathBuf,
    pub channel_map_path: Option<PathBuf>,
    pub adc_threshold_path: Option<PathBuf>,
    pub first_run_number: i32,
    pub last_run_number: i32,
    pub n_threads: i32,
    #[serde(default)]
    pub unpacker: UnpackerConfig,
}

impl Default for Config {
    /// Generate a new Config object. All paths will be empty/invalid
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("None"),
            hdf_path: PathBuf::from("None"),
            channel_map_path: None,
            adc_threshold_path: None,
            first_run_number: 0,
            last_run_number: 0,
            n_threads: 1,
            unpacker: UnpackerConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check if a specific run exists by evaluating the existance of its raw file
    pub fn does_run_exist(&self, run_number: i32) -> bool {
        self.raw_path
            .join(self.get_raw_file_str(run_number))
            .exists()
    }

    /// Get the path to a run's raw file
    pub fn get_raw_file_name(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let raw_file_path = self.raw_path.join(self.get_raw_file_str(run_number));
        if raw_file_path.exists() {
            Ok(raw_file_path)
        } else {
            Err(ConfigError::BadFilePath(raw_file_path))
        }
    }

    /// Get the path to the output hdf5 file
    pub fn get_hdf_file_name(&self, run_number: i32) -> Result<PathBuf, ConfigError> {
        let hdf_file_path: PathBuf = self
            .hdf_path
            .join(format!("{}.h5", self.get_run_str(run_number)));
        if self.hdf_path.exists() {
            Ok(hdf_file_path)
        } else {
            Err(ConfigError::BadFilePath(self.hdf_path.clone()))
        }
    }

    /// Construct the run string
    fn get_run_str(&self, run_number: i32) -> String {
        format!("run_{run_number:0>4}")
    }

    fn get_raw_file_str(&self, run_number: i32) -> String {
        format!("{}.bklm", self.get_run_str(run_number))
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.channel_map_path = Some(PathBuf::from("/data/bklm_map.csv"));
        config.unpacker.keep_even_packages = true;
        let yaml_str = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml_str).unwrap();
        assert_eq!(back.channel_map_path, config.channel_map_path);
        assert_eq!(back.unpacker, config.unpacker);
    }

    #[test]
    fn test_unpacker_defaults_fill_in() {
        let yaml_str = "raw_path: /raw\n\
                        hdf_path: /hdf\n\
                        channel_map_path: null\n\
                        adc_threshold_path: null\n\
                        first_run_number: 1\n\
                        last_run_number: 3\n\
                        n_threads: 2\n\
                        unpacker:\n  \
                          keep_even_packages: true\n";
        let config: Config = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.unpacker.keep_even_packages);
        assert!(config.unpacker.use_default_module_id);
        assert_eq!(config.unpacker.scintillator_threshold, DEFAULT_SCINT_THRESHOLD);
        assert_eq!(config.unpacker.output_digits_name, DEFAULT_DIGITS_NAME);
    }

    #[test]
    fn test_run_names() {
        let config = Config::default();
        assert_eq!(config.get_raw_file_str(7), "run_0007.bklm");
        assert!(config.is_n_threads_valid());
        assert!(!config.does_run_exist(7));
    }
}
