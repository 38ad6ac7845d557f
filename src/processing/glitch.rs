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

//! Emulation of two wave channel quirks.
//!
//! When the channel crosses into a new 32-sample wave frame, the first sample of the frame
//! is played back with the value of the last completed sample of the previous frame.
//! Averaging the two samples around each boundary keeps the error down.
//!
//! While the waveform is being swapped, the DAC outputs its idle (zero DC) level for one
//! tick. This is only audible, so it is applied to previews and never to exported data.

/// Samples per wave frame.
pub const WAVE_FRAME_LEN: usize = 0x20;

/// How far before a frame boundary the blended sample sits. Measured on a DMG-01 with a
/// 440 Hz sine.
pub const BLEND_OFFSET: usize = 2;

/// The 8-bit unsigned level the DAC idles at while the waveform changes.
pub const ZERO_DC_LEVEL: u8 = 0x78;

/// Blends the sample at each frame boundary into the one `BLEND_OFFSET` samples earlier.
pub fn blend_wave_frames(samples: &mut [i16]) {
    for boundary in (WAVE_FRAME_LEN..samples.len()).step_by(WAVE_FRAME_LEN) {
        let target = boundary - BLEND_OFFSET;
        samples[target] = ((samples[boundary] as i32 + samples[target] as i32) / 2) as i16;
    }
}

/// True when the packed byte at `source_index` starts a new wave frame.
#[inline]
pub fn is_waveform_change(source_index: usize) -> bool {
    source_index % WAVE_FRAME_LEN == 0
}
