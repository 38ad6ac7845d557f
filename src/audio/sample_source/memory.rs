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
use super::error::DecodeError;
use super::traits::SampleSource;

/// A sample source that serves samples held in memory.
///
/// Input samples are provided interleaved for convenience but stored planar internally.
pub struct MemorySampleSource {
    planar_samples: Vec<Vec<f32>>,
    current_frame: usize,
    sample_rate: u32,
}

impl MemorySampleSource {
    /// Creates a new memory sample source from interleaved samples.
    pub fn new(interleaved_samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        let num_channels = channel_count.max(1) as usize;
        let num_frames = interleaved_samples.len() / num_channels;

        let mut planar_samples = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in interleaved_samples.chunks_exact(num_channels) {
            for (ch, sample) in planar_samples.iter_mut().zip(frame) {
                ch.push(*sample);
            }
        }

        Self {
            planar_samples,
            current_frame: 0,
            sample_rate,
        }
    }

    fn total_frames(&self) -> usize {
        self.planar_samples.first().map(|c| c.len()).unwrap_or(0)
    }
}

impl SampleSource for MemorySampleSource {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, DecodeError> {
        if output.len() != self.planar_samples.len() {
            return Err(DecodeError::Unsupported(format!(
                "Output has {} channels, expected {}",
                output.len(),
                self.planar_samples.len()
            )));
        }

        let to_copy = self
            .total_frames()
            .saturating_sub(self.current_frame)
            .min(max_frames);
        let range = self.current_frame..self.current_frame + to_copy;
        for (out, samples) in output.iter_mut().zip(&self.planar_samples) {
            out.clear();
            out.extend_from_slice(&samples[range.clone()]);
        }
        self.current_frame += to_copy;

        Ok(to_copy)
    }

    fn channel_count(&self) -> u16 {
        self.planar_samples.len() as u16
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
