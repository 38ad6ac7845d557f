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
use std::{
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{info, span, Level};

use super::{playable_range, PlaybackError, TargetFormat};

/// A mock device. Doesn't actually play anything, but keeps everything it was asked to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    played: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every buffer played so far, oldest first.
    pub fn played(&self) -> Vec<Vec<u8>> {
        match self.played.lock() {
            Ok(played) => played.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl crate::audio::Device for Device {
    fn play(
        &self,
        format: &TargetFormat,
        buffer: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), PlaybackError> {
        let span = span!(Level::INFO, "play preview (mock)");
        let _enter = span.enter();

        let range = playable_range(buffer, offset, len)?;
        info!(
            device = self.name,
            sample_rate = format.sample_rate,
            bytes = range.len(),
            "Playing preview."
        );

        let mut played = match self.played.lock() {
            Ok(played) => played,
            Err(poisoned) => poisoned.into_inner(),
        };
        played.push(range.to_vec());
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, PlaybackError> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
