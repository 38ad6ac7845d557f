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

use std::fmt;

/// The rate the wave channel plays kit samples back at.
pub const CHIP_SAMPLE_RATE: u32 = 11468;

/// The decode rate for samples that will be played back at half speed.
pub const HALF_SPEED_SAMPLE_RATE: u32 = CHIP_SAMPLE_RATE / 2;

/// The rate of the audible preview buffer.
pub const PREVIEW_SAMPLE_RATE: u32 = 44000;

/// Sample format enumeration for audio processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed integer samples (e.g., 16-bit PCM)
    Int,
    /// Unsigned integer samples (e.g., 8-bit PCM)
    UnsignedInt,
    /// Floating point samples (e.g., 32-bit float, 64-bit float)
    Float,
}

impl SampleFormat {
    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Float => "float",
            SampleFormat::Int => "int",
            SampleFormat::UnsignedInt => "uint",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A PCM format descriptor handed to the decode and playback collaborators.
/// Multi-byte integer samples are always little-endian.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample format (signed, unsigned or float)
    pub sample_format: SampleFormat,
    /// Bits per sample
    pub bits_per_sample: u16,
    /// Number of interleaved channels
    pub channels: u16,
}

impl TargetFormat {
    /// The format samples are decoded into: signed 16-bit mono at the chip rate,
    /// or at half the chip rate for half-speed samples.
    pub fn decode(half_speed: bool) -> Self {
        TargetFormat {
            sample_rate: if half_speed {
                HALF_SPEED_SAMPLE_RATE
            } else {
                CHIP_SAMPLE_RATE
            },
            sample_format: SampleFormat::Int,
            bits_per_sample: 16,
            channels: 1,
        }
    }

    /// The format of the upsampled preview: unsigned 8-bit mono at 44 kHz.
    pub fn preview() -> Self {
        TargetFormat {
            sample_rate: PREVIEW_SAMPLE_RATE,
            sample_format: SampleFormat::UnsignedInt,
            bits_per_sample: 8,
            channels: 1,
        }
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        TargetFormat::decode(false)
    }
}
