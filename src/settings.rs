use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{board::Destinations, error::SettingsError};

/// Process-wide configuration, stored as JSON.
///
/// Key names match the files written by earlier versions of the tool so an
/// existing `config.json` keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub latest_checked_email_num: u32,

    #[serde(rename = "USERNAME")]
    pub username: String,

    #[serde(rename = "PWD")]
    pub password: String,

    #[serde(rename = "TRELLO_KEY")]
    pub trello_key: String,

    #[serde(rename = "TRELLO_TOKEN")]
    pub trello_token: String,

    #[serde(rename = "BOARD_ID")]
    pub board_id: String,

    #[serde(rename = "ASSIGNMENTS_LIST_ID")]
    pub assignments_list_id: String,

    #[serde(rename = "MATERIALS_LIST_ID")]
    pub materials_list_id: String,

    #[serde(skip)]
    path: PathBuf,
}

impl Settings {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: &Path,
        username: String,
        password: String,
        trello_key: String,
        trello_token: String,
        board_id: String,
        assignments_list_id: String,
        materials_list_id: String,
    ) -> Self {
        Self {
            latest_checked_email_num: 0,
            username,
            password,
            trello_key,
            trello_token,
            board_id,
            assignments_list_id,
            materials_list_id,
            path: path.to_owned(),
        }
    }

    /// Loads and validates the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;

        let mut settings: Self =
            serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_owned(),
                source,
            })?;

        settings.path = path.to_owned();
        settings.validate()?;
        Ok(settings)
    }

    /// Writes the settings back to the file they came from.
    ///
    /// The file is replaced via rename so a crash mid-write leaves either the
    /// old or the new contents.
    pub fn save(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn destinations(&self) -> Destinations {
        Destinations {
            assignments: self.assignments_list_id.clone(),
            materials: self.materials_list_id.clone(),
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let required = [
            ("USERNAME", &self.username),
            ("PWD", &self.password),
            ("TRELLO_KEY", &self.trello_key),
            ("TRELLO_TOKEN", &self.trello_token),
            ("BOARD_ID", &self.board_id),
            ("ASSIGNMENTS_LIST_ID", &self.assignments_list_id),
            ("MATERIALS_LIST_ID", &self.materials_list_id),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((key, _)) => Err(SettingsError::MissingKey(*key)),
            None => Ok(()),
        }
    }
}
