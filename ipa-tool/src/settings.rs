/*
Copyright 2022 Daniel Brotsky. All rights reserved.

All of the copyrighted work in this repository is licensed under the
GNU Affero General Public License, reproduced in the LICENSE-AGPL file.

Attribution:

Some source files in this repository are derived from files in two Adobe Open
Source projects: the Adobe License Decoder repository found at this URL:
    https://github.com/adobe/adobe-license-decoder.rs
and the FRL Online Proxy repository found at this URL:
    https://github.com/adobe/frl-online-proxy

The files in those original works are copyright 2022 Adobe and the use of those
materials in this work is permitted by the MIT license under which they were
released.  That license is reproduced here in the LICENSE-MIT file.
*/
use std::convert::{TryFrom, TryInto};
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::prelude::*;
use std::sync::Arc;

use config::{Config, Environment, File as ConfigFile, FileFormat};
use dialoguer::{Confirm, Input, Select};
use eyre::{eyre, Report, Result, WrapErr};
use serde::{Deserialize, Serialize};

use ipa_store::{is_known_country, DeviceFamily, Endpoints, NetConfig};

use crate::cli::{Command, ToolArgs};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    pub country: String,
    pub device_family: DeviceFamily,
}

impl Default for Store {
    fn default() -> Self {
        Store { country: "US".to_string(), device_family: DeviceFamily::Iphone }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Keychain {
    pub service: String,
    pub account: String,
}

impl Default for Keychain {
    fn default() -> Self {
        Keychain { service: "ipatool-rs.service".to_string(), account: "account".to_string() }
    }
}

impl Debug for Keychain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("service", &self.service)
            .field("account", &"[OBSCURED]")
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Logging {
    pub level: LogLevel,
    pub destination: LogDestination,
    pub file_path: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: LogLevel::Warn,
            destination: LogDestination::Console,
            file_path: "ipatool.log".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettingsVal {
    pub tool_version: Option<String>,
    pub store: Store,
    pub endpoints: Endpoints,
    pub network: NetConfig,
    pub keychain: Keychain,
    pub logging: Logging,
}

pub type Settings = Arc<SettingsVal>;

/// Obtain default settings
pub fn default_config() -> Settings {
    Settings::new(SettingsVal::default_config())
}

/// Load settings from the configuration file
pub fn load_config_file(args: &ToolArgs) -> Result<Settings> {
    Ok(Settings::new(SettingsVal::load_config(args)?))
}

/// Update (or create) a configuration file after interviewing user
/// No logging on this path, because it might interfere with the interview
pub fn update_config_file(settings: Option<&Settings>, path: &str) -> Result<()> {
    let mut conf: SettingsVal = match settings {
        Some(settings) => settings.as_ref().clone(),
        None => SettingsVal::default_config(),
    };
    conf.update_config().wrap_err("Configuration interview failed")?;
    save_config_file(&conf, path)
}

/// Write settings to a configuration file, stamped with this tool's version
pub fn save_config_file(conf: &SettingsVal, path: &str) -> Result<()> {
    let mut conf = conf.clone();
    conf.tool_version = Some(env!("CARGO_PKG_VERSION").to_string());
    let toml = toml::to_string(&conf)
        .wrap_err(format!("Cannot serialize configuration: {:?}", &conf))?;
    let mut file =
        File::create(path).wrap_err(format!("Cannot create config file: {}", path))?;
    file.write_all(toml.as_bytes())
        .wrap_err(format!("Cannot write config file: {}", path))?;
    eprintln!("Wrote config file '{}'", path);
    Ok(())
}

impl SettingsVal {
    pub fn default_config() -> Self {
        Self { tool_version: Some(env!("CARGO_PKG_VERSION").to_string()), ..Default::default() }
    }

    /// Layer the config file and the environment over the defaults,
    /// then apply the command line overrides.
    pub fn load_config(args: &ToolArgs) -> Result<Self> {
        let default_str = toml::to_string(&SettingsVal::default_config())
            .wrap_err("Cannot serialize default configuration")?;
        let builder = Config::builder()
            .add_source(ConfigFile::from_str(&default_str, FileFormat::Toml))
            .add_source(ConfigFile::new(&args.config_file, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("ipatool").prefix_separator("_").separator("__"));
        let mut settings: Self = builder
            .build()
            .wrap_err(format!("Cannot read config file: {}", &args.config_file))?
            .try_deserialize()
            .wrap_err(format!("Invalid configuration in {}", &args.config_file))?;
        match args.debug {
            1 => settings.logging.level = LogLevel::Debug,
            n if n >= 2 => settings.logging.level = LogLevel::Trace,
            _ => {}
        }
        if let Some(log_to) = &args.log_to {
            let destination: LogDestination = log_to
                .as_str()
                .try_into()
                .wrap_err(format!("Not a recognized log destination: {}", log_to))?;
            settings.logging.destination = destination;
        }
        if let Some(country) = &args.country {
            settings.store.country = country.trim().to_ascii_uppercase();
        }
        if let Some(family) = args.device_family {
            settings.store.device_family = family;
        }
        if !matches!(args.cmd, Command::Configure) && !is_country_code(&settings.store.country) {
            return Err(eyre!("Invalid store country code: {}", &settings.store.country));
        }
        Ok(settings)
    }

    /// Update configuration settings by interviewing user
    /// No logging on this path, because it might interfere with the interview
    pub fn update_config(&mut self) -> Result<()> {
        self.update_store_config()?;
        self.update_logging_config()?;
        Ok(())
    }

    fn update_store_config(&mut self) -> Result<()> {
        eprintln!("The store country must match the country of your Apple ID.");
        let choice: String = Input::new()
            .with_prompt("Two-letter store country code")
            .with_initial_text(&self.store.country)
            .validate_with(country_validator)
            .interact_text()?;
        self.store.country = choice.trim().to_ascii_uppercase();
        if !is_known_country(&self.store.country) {
            eprintln!(
                "There's no storefront id for '{}', so you won't be able to purchase apps.",
                &self.store.country
            );
        }
        let choices = vec!["iphone", "ipad"];
        let default = match self.store.device_family {
            DeviceFamily::Iphone => 0,
            DeviceFamily::Ipad => 1,
        };
        let choice = Select::new()
            .items(&choices)
            .default(default)
            .with_prompt("Device family for catalog searches")
            .interact()?;
        self.store.device_family =
            if choice == 0 { DeviceFamily::Iphone } else { DeviceFamily::Ipad };
        Ok(())
    }

    fn update_logging_config(&mut self) -> Result<()> {
        let choice = Confirm::new()
            .default(false)
            .wait_for_newline(false)
            .with_prompt("Do you want to customize the tool's logging configuration?")
            .interact()?;
        if !choice {
            return Ok(());
        }
        let choices = vec!["no logging", "error", "warn", "info", "debug", "trace"];
        let default = match self.logging.level {
            LogLevel::Off => 0,
            LogLevel::Error => 1,
            LogLevel::Warn => 2,
            LogLevel::Info => 3,
            LogLevel::Debug => 4,
            LogLevel::Trace => 5,
        };
        let choice = Select::new()
            .items(&choices)
            .default(default)
            .with_prompt("Log level")
            .interact()?;
        self.logging.level = choices[choice].try_into()?;
        if matches!(self.logging.level, LogLevel::Off) {
            // no logging, so don't create an empty log file
            self.logging.destination = LogDestination::Console;
            return Ok(());
        }
        eprintln!("The tool can log to the console (standard error) or to a file on disk.");
        let choices = vec!["console", "disk file"];
        let default = match self.logging.destination {
            LogDestination::Console => 0,
            LogDestination::File => 1,
        };
        let choice = Select::new()
            .items(&choices)
            .default(default)
            .with_prompt("Log destination")
            .interact()?;
        if choice == 0 {
            self.logging.destination = LogDestination::Console;
        } else {
            self.logging.destination = LogDestination::File;
            let choice: String = Input::new()
                .allow_empty(false)
                .with_prompt("Name of (or path to) your log file")
                .with_initial_text(&self.logging.file_path)
                .interact_text()?;
            self.logging.file_path = choice;
        }
        Ok(())
    }
}

/// Any two letters will do for search and download; purchase checks
/// separately that the store has a storefront for the country.
pub fn is_country_code(s: &str) -> bool {
    let s = s.trim();
    s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
}

#[allow(clippy::ptr_arg)]
fn country_validator(s: &String) -> Result<()> {
    if is_country_code(s) {
        Ok(())
    } else {
        Err(eyre!("'{}' is not a two-letter country code", s))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    #[serde(alias = "c")]
    Console,
    #[serde(alias = "f")]
    File,
}

impl Default for LogDestination {
    fn default() -> Self {
        LogDestination::Console
    }
}

impl TryFrom<&str> for LogDestination {
    type Error = Report;

    fn try_from(s: &str) -> Result<Self> {
        let sl = s.to_ascii_lowercase();
        if sl.is_empty() {
            Err(eyre!("log destination can't be empty"))
        } else if "console".starts_with(&sl) {
            Ok(LogDestination::Console)
        } else if "file".starts_with(&sl) {
            Ok(LogDestination::File)
        } else {
            Err(eyre!("log destination '{}' must be a prefix of console or file", s))
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warn
    }
}

impl TryFrom<&str> for LogLevel {
    type Error = Report;

    fn try_from(s: &str) -> Result<Self> {
        let sl = s.to_ascii_lowercase();
        if sl == "no logging" || "off".starts_with(&sl) {
            Ok(LogLevel::Off)
        } else if "error".starts_with(&sl) {
            Ok(LogLevel::Error)
        } else if "warn".starts_with(&sl) {
            Ok(LogLevel::Warn)
        } else if "info".starts_with(&sl) {
            Ok(LogLevel::Info)
        } else if "debug".starts_with(&sl) {
            Ok(LogLevel::Debug)
        } else if "trace".starts_with(&sl) {
            Ok(LogLevel::Trace)
        } else {
            Err(eyre!(
                "Log level '{}' must be a prefix of off, error, warn, info, debug, or trace",
                s
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use std::convert::TryFrom;

    use clap::Parser;

    use super::*;

    fn args_for(config_file: &str, extra: &[&str]) -> ToolArgs {
        let mut argv = vec!["ipatool", "-f", config_file];
        argv.extend_from_slice(extra);
        ToolArgs::try_parse_from(argv).expect("Can't parse args")
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let args = args_for(path.to_str().unwrap(), &["auth", "info"]);
        let settings = load_config_file(&args).expect("Can't load defaults");
        assert_eq!(settings.store.country, "US");
        assert_eq!(settings.keychain.service, "ipatool-rs.service");
        assert_eq!(settings.endpoints, Endpoints::default());
        assert_eq!(settings.network.timeout_secs, 60);
    }

    #[test]
    fn test_config_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipatool.toml");
        let path = path.to_str().unwrap();
        let mut conf = SettingsVal::default_config();
        conf.store.country = "GB".to_string();
        conf.endpoints = Endpoints::uniform("http://127.0.0.1:9999");
        save_config_file(&conf, path).expect("Can't save config");
        let settings = load_config_file(&args_for(path, &["auth", "info"])).unwrap();
        assert_eq!(settings.store.country, "GB");
        assert_eq!(settings.endpoints.purchase_host, "http://127.0.0.1:9999");
        let args = args_for(path, &["-d", "-l", "f", "search", "maps", "-c", "jp"]);
        let settings = load_config_file(&args).unwrap();
        assert_eq!(settings.store.country, "JP");
        assert!(matches!(settings.logging.level, LogLevel::Debug));
        assert!(matches!(settings.logging.destination, LogDestination::File));
    }

    #[test]
    fn test_country_must_be_two_letters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let path = path.to_str().unwrap();
        let args = args_for(path, &["search", "maps", "-c", "USA"]);
        assert!(load_config_file(&args).is_err());
        let args = args_for(path, &["download", "-i", "1", "-c", "4x"]);
        assert!(load_config_file(&args).is_err());
    }

    #[test]
    fn test_country_without_storefront_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let path = path.to_str().unwrap();
        assert!(!is_known_country("KE"));
        let settings = load_config_file(&args_for(path, &["search", "maps", "-c", "ke"]))
            .expect("Search should accept any country");
        assert_eq!(settings.store.country, "KE");
        let settings = load_config_file(&args_for(path, &["download", "-i", "1", "-c", "KE"]))
            .expect("Download should accept any country");
        assert_eq!(settings.store.country, "KE");
    }

    #[test]
    fn test_log_names() {
        assert!(matches!(LogLevel::try_from("t").unwrap(), LogLevel::Trace));
        assert!(matches!(LogLevel::try_from("no logging").unwrap(), LogLevel::Off));
        assert!(LogLevel::try_from("verbose").is_err());
        assert!(matches!(LogDestination::try_from("C").unwrap(), LogDestination::Console));
        assert!(LogDestination::try_from("").is_err());
    }

    #[test]
    fn test_keychain_debug_hides_account() {
        let text = format!("{:?}", Keychain::default());
        assert!(!text.contains("\"account\""));
    }
}
