//
// src/settings.rs
//
// Persisted user preferences (TOML) and the commit message history
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0


/// Name of the settings file
pub const SETTINGS_FILE : &str = "settings.toml";

/// Directory of the settings file, below the user configuration directory
pub const SETTINGS_DIR : &str = "vcs-commit";


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, smart_default::SmartDefault)]
#[serde(default)]
pub struct GeneralSettings {
    #[default(true)]
    pub show_unversioned_files : bool,
    #[default(10)]
    pub message_history_size : usize
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HistorySettings {
    /// previous commit messages, most recent first
    pub messages : Vec<String>
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SettingsFile {
    pub general : GeneralSettings,
    pub history : HistorySettings
}

/// The settings store
///
/// Values are held in memory; `write()` persists them. If the file cannot be
/// read the store keeps working with the values it already has, and will not
/// write over the file until it has been read successfully.
#[derive(Debug, Clone)]
pub struct Settings {
    path   : PathBuf,
    values : SettingsFile,
    /// the file could not be read, the values did not come from it
    stale  : bool
}


//
// ####                    ###
//  ##                      ##
//  ##                      ##
//  ##  ## ##  ##   ## ##   ##
//  ##  ### ### ##  ### ##  ##
//  ##  ##  ##  ##  ##  ##  ##
//  ##  ##  ##  ##  ##  ##  ##
// #### ##  ##  ##  #####  ####
//                  ##
//                 ####

use anyhow::{Result, Context, bail};
use crate::error;

impl Settings {
    /// Location of the settings file in the user configuration directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load the settings from `path`
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// a `StalePreference` error.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Settings> {
        let path = path.into();
        let values = read_settings_file(&path)?;

        Ok( Settings { path, values, stale: false } )
    }

    /// Open the settings, falling back to the defaults with a warning
    ///
    /// Without an explicit path, and without a user configuration directory,
    /// the settings live in memory only.
    pub fn open(path: Option<PathBuf>) -> Settings {
        let path = path
            .or_else(Settings::default_path)
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));

        Settings::load(&path).unwrap_or_else(|err| {
            stderr!("{}", err);

            Settings { path, values: SettingsFile::default(), stale: true }
        })
    }

    /// Re-read the file; on failure the current values stay in effect
    pub fn reload(&mut self) {
        match read_settings_file(&self.path) {
            Ok( values ) => {
                self.values = values;
                self.stale = false;
            },
            Err( err )   => {
                tracing::warn!(path = %self.path.display(), "keeping in-memory preferences");
                self.stale = true;
                stderr!("{}", err);
            }
        }
    }

    /// Boolean preference `key` in `section`; unknown keys read as `false`
    pub fn get(&self, section: &str, key: &str) -> bool {
        toml::Value::try_from(&self.values).ok()
            .and_then(|value| value.get(section)?.get(key)?.as_bool())
            .unwrap_or(false)
    }

    /// Set boolean preference `key` in `section` (in memory)
    pub fn set(&mut self, section: &str, key: &str, value: bool) -> Result<()> {
        let mut document = toml::Value::try_from(&self.values)?;

        let table = document.as_table_mut().context("settings are not a table")?;
        table.entry(section.to_owned())
            .or_insert(toml::Value::Table(Default::default()))
            .as_table_mut()
            .with_context(|| format!("settings section [{}] is not a table", section))?
            .insert(key.to_owned(), toml::Value::Boolean(value));

        self.values = document.try_into().with_context(|| {
            format!("'{}.{}' cannot hold a boolean", section, key)
        })?;

        Ok( () )
    }

    /// Persist the settings
    ///
    /// Refused with `SettingsNotWritten` while the file on disk could not be
    /// read, so its contents are not replaced.
    pub fn write(&self) -> Result<()> {
        if self.stale {
            tracing::warn!(path = %self.path.display(), "not overwriting unreadable preferences");
            bail!(error::SettingsNotWritten { path: self.path.clone() });
        }

        let text = toml::to_string_pretty(&self.values)?;

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|err| {
                error::FileWriteError { path: dir.to_owned(), msg: err.to_string() }
            })?;
        }

        std::fs::write(&self.path, text).map_err(|err| {
            error::FileWriteError { path: self.path.clone(), msg: err.to_string() }
        })?;

        tracing::debug!(path = %self.path.display(), "preferences written");

        Ok( () )
    }

    pub fn show_unversioned_files(&self) -> bool {
        self.get("general", "show_unversioned_files")
    }

    /// Previous commit messages, most recent first
    pub fn messages(&self) -> &[String] {
        &self.values.history.messages
    }

    /// Remember a commit message
    ///
    /// Blank messages are ignored; repeating a message moves it to the front.
    pub fn push_message(&mut self, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        let messages = &mut self.values.history.messages;
        messages.retain(|previous| previous != message);
        messages.insert(0, message.to_owned());
        messages.truncate(self.values.general.message_history_size);
    }
}


fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let text = match std::fs::read_to_string(path) {
        Ok( text ) => text,
        Err( err ) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok( SettingsFile::default() );
        },
        Err( err ) => {
            return Err(error::StalePreference { path: path.to_owned(), msg: err.to_string() }.into());
        }
    };

    toml::from_str(&text).map_err(|err| {
        let msg = match err.line_col() {
            Some( (line, col) ) => format!("line {}, column {}: {}", line + 1, col + 1, err),
            None                => err.to_string()
        };

        error::StalePreference { path: path.to_owned(), msg }.into()
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join(SETTINGS_FILE)).unwrap();

        assert!(settings.get("general", "show_unversioned_files"));
        assert!(!settings.get("general", "no_such_key"));
        assert!(settings.messages().is_empty());
    }

    #[test]
    fn test_set_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::load(&path).unwrap();
        settings.set("general", "show_unversioned_files", false).unwrap();
        settings.push_message("Fix the build");
        settings.write().unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(!loaded.get("general", "show_unversioned_files"));
        assert!(!loaded.show_unversioned_files());
        assert_eq!(loaded.messages(), &["Fix the build".to_owned()]);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::load(dir.path().join(SETTINGS_FILE)).unwrap();

        assert!(settings.set("general", "message_history_size", true).is_err());
        assert_eq!(settings.values.general.message_history_size, 10);
    }

    #[test]
    fn test_malformed_file_is_stale_preference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[general\nshow_unversioned_files = ").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(err.downcast_ref::<error::StalePreference>().is_some());

        // open() never fails
        let settings = Settings::open(Some(path));
        assert!(settings.show_unversioned_files());
    }

    #[test]
    fn test_unreadable_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let original = "[general]\nshow_unversioned_files = false\nmessage_history_size = 3\n[history\n";
        std::fs::write(&path, original).unwrap();

        let mut settings = Settings::open(Some(path.clone()));
        settings.push_message("Fix the build");
        settings.set("general", "show_unversioned_files", true).unwrap();

        let err = settings.write().unwrap_err();
        assert!(err.downcast_ref::<error::SettingsNotWritten>().is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

        // once the file is fixed and read back, writing works again
        std::fs::write(&path, "[general]\nshow_unversioned_files = false\n").unwrap();
        settings.reload();
        settings.push_message("Fix the build");
        settings.write().unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(!loaded.show_unversioned_files());
        assert_eq!(loaded.messages(), &["Fix the build".to_owned()]);
    }

    #[test]
    fn test_reload_keeps_values_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[general]\nshow_unversioned_files = false\n").unwrap();

        let mut settings = Settings::load(&path).unwrap();
        assert!(!settings.show_unversioned_files());

        std::fs::write(&path, "not = [valid").unwrap();
        settings.reload();
        assert!(!settings.show_unversioned_files());
        assert!(settings.write().is_err());

        std::fs::write(&path, "[general]\nshow_unversioned_files = true\n").unwrap();
        settings.reload();
        assert!(settings.show_unversioned_files());
    }

    #[test]
    fn test_message_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::load(dir.path().join(SETTINGS_FILE)).unwrap();

        for i in 0..12 {
            settings.push_message(&format!("message {}", i));
        }
        settings.push_message("   ");
        settings.push_message("message 5");

        let messages = settings.messages();
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0], "message 5");
        assert_eq!(messages[1], "message 11");
        assert_eq!(messages.iter().filter(|m| *m == "message 5").count(), 1);
    }
}
