// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fs, path::Path};

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::audio::Audio;
use super::error::ConfigError;

/// Settings applied when converting audio files into packed samples. Every field is
/// optional in YAML; unset fields fall back to their defaults.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ConvertProfile {
    /// Whether to dither while processing (default: true).
    dither: Option<bool>,

    /// Whether to decode at half the chip rate (default: false).
    half_speed: Option<bool>,

    /// Volume adjustment in dB on top of normalization (default: 0).
    volume_db: Option<i32>,

    /// Fixed seed for the dither generator. Unset means a fresh seed for every run.
    seed: Option<u64>,

    /// Preview output configuration.
    audio: Option<Audio>,
}

impl ConvertProfile {
    /// The profile `profile init` writes out, with every default spelled out.
    pub fn with_defaults() -> ConvertProfile {
        ConvertProfile {
            dither: Some(true),
            half_speed: Some(false),
            volume_db: Some(0),
            seed: None,
            audio: Some(Audio::default()),
        }
    }

    /// Deserializes a file from the path into a profile.
    pub fn deserialize(path: &Path) -> Result<ConvertProfile, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<ConvertProfile>()?)
    }

    /// Serialize and save the profile to a file at the given path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        info!(path = ?path, "Writing profile");
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn dither(&self) -> bool {
        self.dither.unwrap_or(true)
    }

    pub fn half_speed(&self) -> bool {
        self.half_speed.unwrap_or(false)
    }

    pub fn volume_db(&self) -> i32 {
        self.volume_db.unwrap_or(0)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the audio configuration, or the default device if none is set.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Overrides fields with whichever values are set in `overrides`.
    pub fn merge(&self, overrides: &ConvertProfile) -> ConvertProfile {
        ConvertProfile {
            dither: overrides.dither.or(self.dither),
            half_speed: overrides.half_speed.or(self.half_speed),
            volume_db: overrides.volume_db.or(self.volume_db),
            seed: overrides.seed.or(self.seed),
            audio: overrides.audio.clone().or_else(|| self.audio.clone()),
        }
    }

    /// Builder-style setters, used to turn command line flags into overrides.
    pub fn set_dither(mut self, dither: Option<bool>) -> Self {
        self.dither = dither;
        self
    }

    pub fn set_half_speed(mut self, half_speed: Option<bool>) -> Self {
        self.half_speed = half_speed;
        self
    }

    pub fn set_volume_db(mut self, volume_db: Option<i32>) -> Self {
        self.volume_db = volume_db;
        self
    }

    pub fn set_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn set_audio(mut self, audio: Option<Audio>) -> Self {
        self.audio = audio;
        self
    }
}
