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

//! Turns decoded 16-bit audio into data the wave channel can play.
//!
//! This module provides:
//! - Dynamics: normalization, silence trimming and dither
//! - Packing to and from the 4-bit nibble format
//! - Emulation of the wave channel's frame boundary and zero DC glitches
//! - The upsampled preview buffer

pub mod dynamics;
pub mod glitch;
pub mod packing;
pub mod preview;

use rand::Rng;
use tracing::debug;

/// Settings that feed a processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub volume_db: i32,
    pub dither: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            volume_db: 0,
            dither: true,
        }
    }
}

/// Runs the full chain on a decoded buffer: normalize, trim, dither (if enabled), clamp
/// to 16 bits and blend wave frames. The input is left untouched.
pub fn process<R: Rng + ?Sized>(original: &[i16], options: ProcessOptions, rng: &mut R) -> Vec<i16> {
    let mut work = dynamics::widen(original);
    dynamics::normalize(&mut work, options.volume_db);

    let work_len = work.len();
    let mut work = dynamics::trim_silence(work);
    debug!(
        input = work_len,
        trimmed = work_len - work.len(),
        volume_db = options.volume_db,
        dither = options.dither,
        "Processed dynamics"
    );

    if options.dither {
        dynamics::dither(&mut work, rng);
    }

    let mut processed = dynamics::narrow(&work);
    glitch::blend_wave_frames(&mut processed);
    processed
}
