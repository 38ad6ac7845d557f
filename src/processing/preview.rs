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
use crate::audio::format::{CHIP_SAMPLE_RATE, PREVIEW_SAMPLE_RATE};

use super::glitch::{is_waveform_change, ZERO_DC_LEVEL};
use super::packing::split;

/// Length in bytes of the preview buffer for `packed_len` packed bytes.
pub fn preview_len(packed_len: usize) -> usize {
    packed_len * PREVIEW_SAMPLE_RATE as usize / CHIP_SAMPLE_RATE as usize * 2
}

/// Upsamples packed data to an unsigned 8-bit buffer at the preview rate with
/// sample-and-hold, including the zero DC drop at every waveform change.
pub fn upsample(packed: &[u8]) -> Vec<u8> {
    let mut preview = vec![0u8; preview_len(packed.len())];
    let pairs = preview.len() / 2;
    if packed.is_empty() {
        return preview;
    }

    for (i, out) in preview.chunks_exact_mut(2).enumerate() {
        let ratio = (i as f64 / pairs as f64).min(1.0);
        let source_index = ((ratio * packed.len() as f64) as usize).min(packed.len() - 1);

        let (high, low) = split(packed[source_index]);
        out[0] = high;
        out[1] = low;

        if is_waveform_change(source_index) {
            out[0] = ZERO_DC_LEVEL;
        }
    }
    preview
}
