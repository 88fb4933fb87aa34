//! Allows configuration stuff to be read from settings.json
//!
//! The vj server only needs a handful of values (which port the control
//! listener binds, udp vs tcp, which peer is allowed to connect in tcp
//! mode, and the render surface size the normalized cursor messages get
//! scaled by).  Anything missing falls back to the defaults object.
use json::JsonValue;
use log::{info, warn};
use regex::Regex;
use std::{
    error::Error,
    fmt,
    fs::File,
    io::{ErrorKind, Write},
};

#[derive(Debug)]
pub struct MissingConfigError {
    key: String,
}

impl fmt::Display for MissingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Required configuration value '{}' is missing", self.key)
    }
}

impl Error for MissingConfigError {}

pub struct Config {
    filename: String,
    settings: JsonValue,
    defaults: JsonValue,
}

impl Config {
    pub fn build(filename: String, defaults: JsonValue) -> Result<Config, std::io::Error> {
        // Validate filename only contains valid characters and ends in .json
        let filename_regex = Regex::new(r"^[a-zA-Z0-9_\-\.]+\.json$").unwrap();
        if !filename_regex.is_match(&filename) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "Invalid filename - must contain only letters, numbers, underscore, dash, dot and end in .json"
            ));
        }

        let mut config = Config {
            filename,
            settings: json::object! {},
            defaults,
        };

        if let Err(err) = config.load_from_file() {
            warn!("Using default settings: {}", err);
        }

        Ok(config)
    }

    fn load_from_file(&mut self) -> std::io::Result<()> {
        match std::fs::read_to_string(&self.filename) {
            Ok(raw_data) => match json::parse(&raw_data) {
                Ok(parsed) => {
                    self.settings.clone_from(&parsed);
                    info!("Loaded settings from {}", self.filename);
                    Ok(())
                }
                Err(err) => {
                    warn!("Failed to parse config file {}: {}", self.filename, err);
                    Ok(())
                }
            },
            Err(err) => Err(err),
        }
    }

    pub fn get_str_value(&self, key: &str, default: Option<String>) -> Result<String, MissingConfigError> {
        // First check settings
        if let Some(val) = self.settings[key].as_str() {
            return Ok(val.to_string());
        }

        // If explicit default is provided, use it
        if let Some(def) = default {
            return Ok(def);
        }

        // Otherwise check defaults
        if let Some(val) = self.defaults[key].as_str() {
            return Ok(val.to_string());
        }

        // If no value found anywhere, return error
        Err(MissingConfigError { key: key.to_string() })
    }

    pub fn get_bool_value(&self, key: &str, default: Option<bool>) -> Result<bool, MissingConfigError> {
        if let Some(val) = self.settings[key].as_bool() {
            return Ok(val);
        }

        if let Some(def) = default {
            return Ok(def);
        }

        if let Some(val) = self.defaults[key].as_bool() {
            return Ok(val);
        }

        Err(MissingConfigError { key: key.to_string() })
    }

    pub fn get_u32_value(&self, key: &str, default: Option<u32>) -> Result<u32, MissingConfigError> {
        if let Some(val) = self.settings[key].as_u32() {
            return Ok(val);
        }

        if let Some(def) = default {
            return Ok(def);
        }

        if let Some(val) = self.defaults[key].as_u32() {
            return Ok(val);
        }

        Err(MissingConfigError { key: key.to_string() })
    }

    pub fn set_value(&mut self, key: &str, val: impl Into<JsonValue>) -> Result<(), String> {
        let json_val = val.into();
        match json_val {
            JsonValue::Short(_) | JsonValue::String(_) | JsonValue::Boolean(_) | JsonValue::Number(_) => {
                self.settings[key] = json_val;
                Ok(())
            }
            _ => Err(format!("Unsupported value type for key: {}", key)),
        }
    }

    pub fn save_settings(&self) -> std::io::Result<bool> {
        let file_open_result = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.filename.as_str());
        match file_open_result {
            Ok(mut f) => self.flush_to_file(&mut f),
            Err(error) => {
                // File open failed.  See if we need to create it
                match error.kind() {
                    ErrorKind::NotFound => {
                        // no file, create one
                        let mut f = std::fs::File::create(self.filename.as_str())?;
                        self.flush_to_file(&mut f)
                    }
                    other_error => Err(std::io::Error::new(
                        other_error,
                        format!("Cannot create settings file: {}", self.filename),
                    )),
                }
            }
        }
    }

    fn flush_to_file(&self, f: &mut File) -> std::io::Result<bool> {
        f.write_all(self.settings.pretty(2).as_bytes())?;
        f.sync_all()?;
        Ok(true)
    }
}

#[cfg(test)]
mod test_config {

    use super::*;

    fn test_defaults() -> JsonValue {
        json::object! {
            "osc_port": 7000,
            "osc_transport": "udp",
            "allowed_peer": "127.0.0.1:10000"
        }
    }

    fn test_config(filename: &str) -> Config {
        match Config::build(filename.to_string(), test_defaults()) {
            Ok(config) => config,
            Err(e) => panic!("Failed to build config: {}", e),
        }
    }

    #[test]
    fn should_build_with_any_valid_name() {
        // you should be able to build a config object from a valid file name, if it doesn't exist
        let config = test_config("no_such_settings.json");
        assert_eq!(config.filename, "no_such_settings.json");
    }

    #[test]
    fn should_error_with_invalid_name() {
        let filename = "I'm_;,`all_{jacked}_up";
        let boom = Config::build(filename.to_string(), test_defaults());
        match boom {
            Ok(_) => assert!(false, "Expected error for invalid filename"),
            Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
        }
    }

    #[test]
    fn should_get_defaults_with_no_file() {
        let config = test_config("no_such_settings.json");
        assert_eq!(config.get_u32_value("osc_port", None).unwrap(), 7000);
        assert_eq!(config.get_str_value("osc_transport", None).unwrap(), "udp");
        assert_eq!(
            config.get_str_value("allowed_peer", None).unwrap(),
            "127.0.0.1:10000"
        );
    }

    #[test]
    fn explicit_set_overrides_default() {
        // You should be able to get a set value that overrides the config default
        let mut config = test_config("no_such_settings.json");
        config.set_value("osc_port", 8088).unwrap();
        assert_eq!(config.get_u32_value("osc_port", None).unwrap(), 8088);
    }

    #[test]
    fn explicit_get_default_wins_over_defaults_object() {
        let config = test_config("no_such_settings.json");
        assert_eq!(
            config.get_u32_value("i_dont_exist", Some(99)).unwrap(),
            99
        );
    }

    #[test]
    fn error_on_missing_key() {
        let config = test_config("no_such_settings.json");
        let boom = config.get_str_value("i_dont_exist", None);
        assert_eq!(boom.is_err(), true);
        assert_eq!(
            boom.err().unwrap().to_string(),
            "Required configuration value 'i_dont_exist' is missing"
        );
    }

    #[test]
    fn set_value_with_unsupported_type() {
        // arrays don't belong in this config store
        let mut config = test_config("no_such_settings.json");
        let set_result = config.set_value("unsupported", json::array!["value1", "value2"]);
        assert_eq!(set_result.is_err(), true);
    }
}
