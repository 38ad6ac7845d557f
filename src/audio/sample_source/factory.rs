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
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::audio::{SampleFormat, TargetFormat};

use super::audio::AudioSampleSource;
use super::error::DecodeError;
use super::mixdown::MonoMixdown;
use super::pcm::PcmStream;
use super::traits::{PcmDecoder, SampleSource};
use super::transcoder::AudioTranscoder;

/// Create a SampleSource from a file, automatically detecting the file type.
pub fn create_sample_source_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn SampleSource>, DecodeError> {
    Ok(Box::new(AudioSampleSource::from_file(path)?))
}

/// Decodes with symphonia, folds to mono and resamples with rubato.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl PcmDecoder for SymphoniaDecoder {
    fn open(
        &self,
        path: &Path,
        format: &TargetFormat,
    ) -> Result<Box<dyn Read + Send>, DecodeError> {
        if format.sample_format != SampleFormat::Int
            || format.bits_per_sample != 16
            || format.channels != 1
        {
            return Err(DecodeError::Unsupported(format!(
                "cannot decode to {}-bit {} with {} channels",
                format.bits_per_sample, format.sample_format, format.channels
            )));
        }

        let source = create_sample_source_from_file(path)?;
        info!(
            path = ?path,
            source_rate = source.sample_rate(),
            channels = source.channel_count(),
            target_rate = format.sample_rate,
            "Decoding audio"
        );

        let mono = MonoMixdown::new(source);
        let transcoder = AudioTranscoder::new(mono, format.sample_rate)?;
        Ok(Box::new(PcmStream::new(transcoder)))
    }
}
