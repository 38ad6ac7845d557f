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
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{error, info, span, Level};

use crate::audio::format::CHIP_SAMPLE_RATE;
use crate::audio::sample_source::PcmDecoder;
use crate::audio::{Device, PlaybackError, TargetFormat};
use crate::config::ConvertProfile;
use crate::processing::{glitch::WAVE_FRAME_LEN, packing, preview};
use crate::sample::{name_from_path, Sample, SampleError};

mod error;

pub use error::ConvertError;

/// The extension packed files are written with.
pub const PACKED_EXTENSION: &str = "nib";

/// Creates the dither generator for the input at `index`. A fixed seed gives every input
/// its own repeatable stream.
pub fn dither_rng(seed: Option<u64>, index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_entropy(),
    }
}

/// Decodes and processes one file with the given profile.
pub fn load_sample(
    path: &Path,
    profile: &ConvertProfile,
    decoder: &dyn PcmDecoder,
    rng: &mut StdRng,
) -> Result<Sample, SampleError> {
    let mut sample = Sample::from_file(path, decoder, profile.dither(), profile.half_speed(), rng)?;
    if profile.volume_db() != 0 {
        sample.set_volume_db(profile.volume_db())?;
        sample.process_samples(rng);
    }
    Ok(sample)
}

/// Converts one file and writes `<name>.nib` into `out_dir`.
pub fn convert_file(
    path: &Path,
    out_dir: &Path,
    profile: &ConvertProfile,
    decoder: &dyn PcmDecoder,
    rng: &mut StdRng,
) -> Result<PathBuf, SampleError> {
    let mut sample = load_sample(path, profile, decoder, rng)?;
    let out_path = output_path(out_dir, sample.name());

    let mut file = fs::File::create(&out_path)?;
    sample.write_packed(&mut file)?;
    info!(
        input = ?path,
        output = ?out_path,
        bytes = sample.length_in_bytes(),
        "Wrote packed sample"
    );
    Ok(out_path)
}

/// Where the packed file for the sample called `name` goes.
pub fn output_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}.{}", name, PACKED_EXTENSION))
}

/// Converts every input in parallel. Results come back in input order. Inputs that would
/// write the same output file are all rejected and nothing is written for them.
pub fn convert_all(
    inputs: &[PathBuf],
    out_dir: &Path,
    profile: &ConvertProfile,
    decoder: &dyn PcmDecoder,
) -> Vec<Result<PathBuf, ConvertError>> {
    let span = span!(Level::INFO, "convert", inputs = inputs.len());
    let _enter = span.enter();

    let outputs: Vec<PathBuf> = inputs
        .iter()
        .map(|input| output_path(out_dir, &name_from_path(input)))
        .collect();
    let mut output_counts: HashMap<&Path, usize> = HashMap::new();
    for output in &outputs {
        *output_counts.entry(output.as_path()).or_default() += 1;
    }

    inputs
        .par_iter()
        .zip(&outputs)
        .enumerate()
        .map(|(index, (input, output))| {
            let result = if output_counts[output.as_path()] > 1 {
                Err(ConvertError::DuplicateOutput {
                    output: output.clone(),
                })
            } else {
                let mut rng = dither_rng(profile.seed(), index);
                convert_file(input, out_dir, profile, decoder, &mut rng).map_err(ConvertError::from)
            };
            if let Err(e) = &result {
                error!(input = ?input, err = %e, "Unable to convert sample");
            }
            result
        })
        .collect()
}

/// Sizes of a packed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedInfo {
    pub bytes: usize,
    pub samples: usize,
    pub frames: usize,
    pub duration: Duration,
}

impl PackedInfo {
    pub fn new(packed: &[u8], half_speed: bool) -> PackedInfo {
        let samples = packed.len() * 2;
        let rate = TargetFormat::decode(half_speed).sample_rate;
        PackedInfo {
            bytes: packed.len(),
            samples,
            frames: samples.div_ceil(WAVE_FRAME_LEN),
            duration: Duration::from_secs_f64(samples as f64 / rate as f64),
        }
    }
}

/// Writes the 16-bit decode of packed data as a mono WAV at the chip rate.
pub fn unpack_to_wav(packed: &[u8], path: &Path) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: 1,
            sample_rate: CHIP_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: WavSampleFormat::Int,
        },
    )?;
    for sample in packing::unpack_i16(packed) {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Upsamples packed data and starts playing it. Returns how long playback takes.
pub fn preview(packed: &[u8], device: &dyn Device) -> Result<Duration, PlaybackError> {
    let span = span!(Level::INFO, "preview");
    let _enter = span.enter();

    let format = TargetFormat::preview();
    let buffer = preview::upsample(packed);
    device.play(&format, &buffer, 0, buffer.len())?;
    Ok(Duration::from_secs_f64(
        buffer.len() as f64 / format.sample_rate as f64,
    ))
}
