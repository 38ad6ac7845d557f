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
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use super::error::DecodeError;
use super::traits::SampleSource;

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Planar FIFO of resampled frames waiting to be handed out.
struct PlanarFifo {
    channels: Vec<Vec<f32>>,
    read_pos: usize,
}

impl PlanarFifo {
    fn new(num_channels: usize) -> Self {
        Self {
            channels: vec![Vec::new(); num_channels],
            read_pos: 0,
        }
    }

    fn available(&self) -> usize {
        self.channels
            .first()
            .map(|c| c.len() - self.read_pos)
            .unwrap_or(0)
    }

    fn push(&mut self, planar: &[Vec<f32>], range: std::ops::Range<usize>) {
        for (ch, input) in self.channels.iter_mut().zip(planar) {
            ch.extend_from_slice(&input[range.clone()]);
        }
    }

    fn drain_into(&mut self, output: &mut [Vec<f32>], max_frames: usize) -> usize {
        let to_copy = self.available().min(max_frames);
        for (out, ch) in output.iter_mut().zip(&self.channels) {
            out.extend_from_slice(&ch[self.read_pos..self.read_pos + to_copy]);
        }
        self.read_pos += to_copy;

        // Compact once a good amount has been consumed.
        if self.read_pos > 4096 {
            for ch in self.channels.iter_mut() {
                ch.drain(..self.read_pos);
            }
            self.read_pos = 0;
        }
        to_copy
    }
}

/// Converts a source to a new sample rate with a rubato sinc resampler. When the rates
/// already match, samples pass straight through.
///
/// The resampler's group delay is trimmed from the start of the output and the output is
/// cut to `ceil(input_frames * ratio)` frames, so the result lines up with the input.
pub struct AudioTranscoder<S: SampleSource> {
    source: S,
    resampler: Option<SincFixedIn<f32>>,
    source_rate: u32,
    target_rate: u32,
    channels: u16,

    /// Sliding window of input frames (planar).
    input: Vec<Vec<f32>>,
    /// Scratch for reading from the source.
    read_buffer: Vec<Vec<f32>>,
    /// Scratch the resampler writes into.
    output_scratch: Vec<Vec<f32>>,
    output: PlanarFifo,

    source_finished: bool,
    input_frames_total: usize,
    delay_remaining: usize,
    output_frames_total: usize,
}

impl<S: SampleSource> AudioTranscoder<S> {
    /// Creates a transcoder that converts `source` to `target_rate`.
    pub fn new(source: S, target_rate: u32) -> Result<Self, DecodeError> {
        let source_rate = source.sample_rate();
        let channels = source.channel_count();
        let num_channels = channels as usize;

        let (resampler, output_scratch, delay) = if source_rate != target_rate {
            let sinc_params = SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                oversampling_factor: 128,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::BlackmanHarris2,
            };
            let ratio = target_rate as f64 / source_rate as f64;
            let r = SincFixedIn::<f32>::new(
                ratio,
                1.0,
                sinc_params,
                INPUT_BLOCK_SIZE,
                num_channels,
            )
            .map_err(|_e| DecodeError::ResamplingFailed(source_rate, target_rate))?;

            let scratch = r.output_buffer_allocate(true);
            let delay = r.output_delay();
            (Some(r), scratch, delay)
        } else {
            (None, Vec::new(), 0)
        };

        debug!(source_rate, target_rate, channels, "Created transcoder");

        Ok(AudioTranscoder {
            source,
            resampler,
            source_rate,
            target_rate,
            channels,
            input: vec![Vec::new(); num_channels],
            read_buffer: vec![Vec::with_capacity(INPUT_BLOCK_SIZE); num_channels],
            output_scratch,
            output: PlanarFifo::new(num_channels),
            source_finished: false,
            input_frames_total: 0,
            delay_remaining: delay,
            output_frames_total: 0,
        })
    }

    fn input_len(&self) -> usize {
        self.input.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of output frames the whole input maps to. Only final once the source is done.
    fn expected_output_frames(&self) -> usize {
        (self.input_frames_total as f64 * self.target_rate as f64 / self.source_rate as f64)
            .ceil() as usize
    }

    /// Moves freshly resampled frames into the FIFO, skipping the resampler delay and
    /// never going past the expected length once the source has finished.
    fn accept_output(&mut self, produced: usize) {
        let skip = self.delay_remaining.min(produced);
        self.delay_remaining -= skip;

        let mut end = produced;
        if self.source_finished {
            let allowed = self
                .expected_output_frames()
                .saturating_sub(self.output_frames_total);
            end = end.min(skip + allowed);
        }
        if end > skip {
            self.output.push(&self.output_scratch, skip..end);
            self.output_frames_total += end - skip;
        }
    }

    /// Runs the resampler once. Returns false once nothing more can be produced.
    fn fill_output(&mut self) -> Result<bool, DecodeError> {
        let needed = match self.resampler.as_ref() {
            Some(r) => r.input_frames_next(),
            None => return Ok(false),
        };

        while !self.source_finished && self.input_len() < needed {
            let wanted = needed - self.input_len();
            let read = self.source.next_chunk(&mut self.read_buffer, wanted)?;
            if read == 0 {
                self.source_finished = true;
                break;
            }
            for (ch, chunk) in self.input.iter_mut().zip(&self.read_buffer) {
                ch.extend_from_slice(&chunk[..read]);
            }
            self.input_frames_total += read;
        }

        let (source_rate, target_rate) = (self.source_rate, self.target_rate);
        let failed =
            |_e: rubato::ResampleError| DecodeError::ResamplingFailed(source_rate, target_rate);

        if self.input_len() >= needed {
            let Some(resampler) = self.resampler.as_mut() else {
                return Ok(false);
            };
            let (consumed, produced) = resampler
                .process_into_buffer(&self.input, &mut self.output_scratch, None)
                .map_err(failed)?;
            for ch in self.input.iter_mut() {
                ch.drain(..consumed);
            }
            self.accept_output(produced);
            return Ok(true);
        }

        // The source is exhausted: push the tail through and flush the delay line until the
        // expected length has been reached.
        if self.output_frames_total >= self.expected_output_frames() {
            return Ok(false);
        }
        let has_tail = self.input_len() > 0;
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(false);
        };
        let (_, produced) = if has_tail {
            resampler
                .process_partial_into_buffer(
                    Some(self.input.as_slice()),
                    &mut self.output_scratch,
                    None,
                )
                .map_err(failed)?
        } else {
            resampler
                .process_partial_into_buffer(None::<&[Vec<f32>]>, &mut self.output_scratch, None)
                .map_err(failed)?
        };
        for ch in self.input.iter_mut() {
            ch.clear();
        }
        self.accept_output(produced);
        Ok(produced > 0)
    }
}

impl<S: SampleSource> SampleSource for AudioTranscoder<S> {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, DecodeError> {
        if self.resampler.is_none() {
            return self.source.next_chunk(output, max_frames);
        }

        if output.len() != self.channels as usize {
            return Err(DecodeError::Unsupported(format!(
                "Output has {} channels, expected {}",
                output.len(),
                self.channels
            )));
        }
        for ch in output.iter_mut() {
            ch.clear();
        }

        let mut total = 0;
        while total < max_frames {
            total += self.output.drain_into(output, max_frames - total);
            if total >= max_frames {
                break;
            }
            if !self.fill_output()? && self.output.available() == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.target_rate
    }
}
