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
use std::{any::Any, fmt, sync::Arc};

use crate::config;

pub mod cpal;
mod error;
pub mod format;
pub mod mock;
pub mod sample_source;

pub use error::PlaybackError;
pub use format::{SampleFormat, TargetFormat};

/// An output that plays 8-bit previews.
pub trait Device: Any + fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts playing `len` bytes of the buffer from `offset` and returns without waiting
    /// for playback to finish.
    fn play(
        &self,
        format: &TargetFormat,
        buffer: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), PlaybackError>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, PlaybackError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, PlaybackError> {
    cpal::Device::list()
}

/// Gets the device named in the audio configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, PlaybackError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(device)?))
}

/// Checks the requested range against the buffer and returns it.
pub(crate) fn playable_range(
    buffer: &[u8],
    offset: usize,
    len: usize,
) -> Result<&[u8], PlaybackError> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(PlaybackError::InvalidRange {
            offset,
            len,
            size: buffer.len(),
        })
}
