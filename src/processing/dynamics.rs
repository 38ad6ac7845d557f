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

//! Level handling on the widened working buffer: peak normalization, silence trimming,
//! TPDF dither and the final clamp back down to 16 bits.

use rand::Rng;

/// Anything quieter than this counts as silence when trimming.
pub const SILENCE_THRESHOLD: i32 = i16::MAX as i32 / 16;

/// Amplitude of the dither noise: one LSB of the 4-bit output.
pub const DITHER_NOISE_LEVEL: i32 = 256 * 16;

/// Widens 16-bit samples into the working buffer.
pub fn widen(samples: &[i16]) -> Vec<i32> {
    samples.iter().map(|&s| s as i32).collect()
}

/// The loudest sample as a fraction of full scale, measured against the negative limit for
/// negative samples and the positive limit for positive ones. Always in [0, 1] for 16-bit input.
pub fn peak(samples: &[i32]) -> f64 {
    samples
        .iter()
        .map(|&s| {
            let s = s as f64;
            if s < 0.0 {
                s / i16::MIN as f64
            } else {
                s / i16::MAX as f64
            }
        })
        .fold(0.0, f64::max)
}

/// Scales the buffer so its peak hits full scale, then applies `volume_db` on top.
/// A silent buffer is left alone.
pub fn normalize(samples: &mut [i32], volume_db: i32) {
    let peak = peak(samples);
    if peak == 0.0 {
        return;
    }

    let gain = 10f64.powf(volume_db as f64 / 20.0);
    for sample in samples.iter_mut() {
        *sample = ((*sample as f64 * gain) / peak) as i32;
    }
}

/// Index of the first sample at or above the silence threshold, or `len` if there is none.
pub fn head_pos(samples: &[i32]) -> usize {
    samples
        .iter()
        .position(|s| s.unsigned_abs() >= SILENCE_THRESHOLD as u32)
        .unwrap_or(samples.len())
}

/// Index of the last sample at or above the silence threshold, if any.
pub fn tail_pos(samples: &[i32]) -> Option<usize> {
    samples
        .iter()
        .rposition(|s| s.unsigned_abs() >= SILENCE_THRESHOLD as u32)
}

/// Cuts leading and trailing silence. A buffer that is silent throughout is kept whole.
pub fn trim_silence(samples: Vec<i32>) -> Vec<i32> {
    let head = head_pos(&samples);
    match tail_pos(&samples) {
        Some(tail) if head <= tail => samples[head..=tail].to_vec(),
        _ => samples,
    }
}

/// Adds triangular-PDF dither. Each step subtracts a fresh uniform draw from the previous
/// one, so consecutive noise values share a draw.
pub fn dither<R: Rng + ?Sized>(samples: &mut [i32], rng: &mut R) {
    let mut state: f32 = rng.gen();
    for sample in samples.iter_mut() {
        let previous = state;
        state = rng.gen();
        *sample = (*sample as f32 + (previous - state) * DITHER_NOISE_LEVEL as f32) as i32;
    }
}

/// Clamps the working buffer into 16-bit range and narrows it.
pub fn narrow(samples: &[i32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| s.clamp(i16::MIN as i32, i16::MAX as i32) as i16)
        .collect()
}
