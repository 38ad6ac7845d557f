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

/// Folds every channel of a source into a single channel by averaging.
pub struct MonoMixdown<S: SampleSource> {
    source: S,
    /// Planar scratch buffer for reading from the source.
    source_planar: Vec<Vec<f32>>,
}

impl<S: SampleSource> MonoMixdown<S> {
    pub fn new(source: S) -> Self {
        let channels = source.channel_count() as usize;
        Self {
            source,
            source_planar: vec![Vec::new(); channels],
        }
    }
}

impl<S: SampleSource> SampleSource for MonoMixdown<S> {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, DecodeError> {
        if output.len() != 1 {
            return Err(DecodeError::Unsupported(format!(
                "Output has {} channels, expected 1",
                output.len()
            )));
        }
        let out = &mut output[0];
        out.clear();

        let frames = self.source.next_chunk(&mut self.source_planar, max_frames)?;
        if self.source_planar.len() == 1 {
            out.extend_from_slice(&self.source_planar[0][..frames]);
            return Ok(frames);
        }

        let scale = 1.0 / self.source_planar.len() as f32;
        out.extend((0..frames).map(|frame| {
            self.source_planar.iter().map(|ch| ch[frame]).sum::<f32>() * scale
        }));
        Ok(frames)
    }

    fn channel_count(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample_source::MemorySampleSource;

    #[test]
    fn test_mixdown_averages_channels() {
        // Interleaved stereo: L=1.0/R=0.0, L=-1.0/R=-0.5
        let source = MemorySampleSource::new(vec![1.0, 0.0, -1.0, -0.5], 2, 44100);
        let mut mixdown = MonoMixdown::new(source);
        assert_eq!(mixdown.channel_count(), 1);
        assert_eq!(mixdown.sample_rate(), 44100);

        let mut output = vec![Vec::new()];
        let frames = mixdown.next_chunk(&mut output, 16).unwrap();
        assert_eq!(frames, 2);
        assert_eq!(output[0], vec![0.5, -0.75]);

        assert_eq!(mixdown.next_chunk(&mut output, 16).unwrap(), 0);
        assert!(output[0].is_empty());
    }

    #[test]
    fn test_mixdown_passes_mono_through() {
        let source = MemorySampleSource::new(vec![0.25, -0.25, 0.5], 1, 11468);
        let mut mixdown = MonoMixdown::new(source);

        let mut output = vec![Vec::new()];
        assert_eq!(mixdown.next_chunk(&mut output, 2).unwrap(), 2);
        assert_eq!(output[0], vec![0.25, -0.25]);
        assert_eq!(mixdown.next_chunk(&mut output, 2).unwrap(), 1);
        assert_eq!(output[0], vec![0.5]);
    }

    #[test]
    fn test_mixdown_rejects_wrong_output_shape() {
        let source = MemorySampleSource::new(vec![0.0; 4], 2, 44100);
        let mut mixdown = MonoMixdown::new(source);
        let mut output = vec![Vec::new(), Vec::new()];
        assert!(mixdown.next_chunk(&mut output, 4).is_err());
    }
}
