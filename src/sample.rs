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
    fmt,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use rand::Rng;
use tracing::{debug, info, span, Level};

use crate::audio::sample_source::{DecodeError, PcmDecoder};
use crate::audio::TargetFormat;
use crate::processing::{self, packing, ProcessOptions};

mod error;

pub use error::SampleError;

/// A single drum kit sample.
///
/// A sample decoded from an audio file keeps the decoded audio around so it can be
/// reprocessed with a different volume or dither setting. A sample built from packed
/// nibbles only has its processed samples and can't be adjusted.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    source: Option<PathBuf>,
    original: Option<Vec<i16>>,
    processed: Vec<i16>,
    read_pos: usize,
    volume_db: i32,
    dither: bool,
}

impl Sample {
    /// Creates a sample from packed nibble data.
    pub fn from_nibbles(nibbles: &[u8], name: &str) -> Sample {
        Sample::from_samples(packing::unpack_i16(nibbles), name)
    }

    /// Creates a sample from already processed 16-bit samples.
    pub fn from_samples(processed: Vec<i16>, name: &str) -> Sample {
        Sample {
            name: name.to_string(),
            source: None,
            original: None,
            processed,
            read_pos: 0,
            volume_db: 0,
            dither: true,
        }
    }

    /// Decodes the given file and processes it.
    pub fn from_file<R: Rng + ?Sized>(
        path: &Path,
        decoder: &dyn PcmDecoder,
        dither: bool,
        half_speed: bool,
        rng: &mut R,
    ) -> Result<Sample, SampleError> {
        let span = span!(Level::INFO, "load sample", path = ?path);
        let _enter = span.enter();

        let original = decode(path, decoder, half_speed)?;
        let mut sample = Sample {
            name: name_from_path(path),
            source: Some(path.to_path_buf()),
            original: Some(original),
            processed: Vec::new(),
            read_pos: 0,
            volume_db: 0,
            dither,
        };
        sample.process_samples(rng);

        info!(
            name = sample.name,
            samples = sample.length_in_samples(),
            bytes = sample.length_in_bytes(),
            "Loaded sample"
        );
        Ok(sample)
    }

    /// Decodes the source file again, e.g. after the half speed setting changed, and
    /// reprocesses it. Samples without a source file are left as they are. On failure the
    /// sample keeps its previous data.
    pub fn reload<R: Rng + ?Sized>(
        &mut self,
        half_speed: bool,
        decoder: &dyn PcmDecoder,
        rng: &mut R,
    ) -> Result<(), SampleError> {
        let Some(source) = &self.source else {
            return Ok(());
        };

        let original = decode(source, decoder, half_speed)?;
        self.original = Some(original);
        self.process_samples(rng);
        Ok(())
    }

    /// Rebuilds the processed samples from the original audio with the current volume and
    /// dither settings. Does nothing for samples without original audio.
    pub fn process_samples<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(original) = &self.original else {
            return;
        };

        let options = ProcessOptions {
            volume_db: self.volume_db,
            dither: self.dither,
        };
        self.processed = processing::process(original, options, rng);
        debug!(
            name = self.name,
            original = original.len(),
            processed = self.processed.len(),
            "Processed sample"
        );
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file this sample was decoded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn processed(&self) -> &[i16] {
        &self.processed
    }

    pub fn length_in_samples(&self) -> usize {
        self.processed.len()
    }

    /// Size of the packed data in bytes, always a multiple of 16.
    pub fn length_in_bytes(&self) -> usize {
        packing::packed_len(self.length_in_samples())
    }

    /// A copy of the original audio if there is one, otherwise of the processed samples.
    pub fn work_sample_data(&self) -> Vec<i16> {
        self.original
            .as_ref()
            .unwrap_or(&self.processed)
            .clone()
    }

    /// Rewinds the read cursor.
    pub fn seek_start(&mut self) {
        self.read_pos = 0;
    }

    /// Reads the next processed sample, or `None` once the cursor is past the end.
    pub fn read(&mut self) -> Option<i16> {
        let sample = self.processed.get(self.read_pos).copied()?;
        self.read_pos += 1;
        Some(sample)
    }

    pub fn can_adjust_volume(&self) -> bool {
        self.original.is_some()
    }

    pub fn volume_db(&self) -> i32 {
        self.volume_db
    }

    /// Sets the volume used by the next call to `process_samples`.
    pub fn set_volume_db(&mut self, volume_db: i32) -> Result<(), SampleError> {
        if !self.can_adjust_volume() {
            return Err(SampleError::VolumeNotAdjustable(self.name.clone()));
        }
        self.volume_db = volume_db;
        Ok(())
    }

    pub fn dither_enabled(&self) -> bool {
        self.dither
    }

    /// Sets whether dither is applied by the next call to `process_samples`.
    pub fn set_dither(&mut self, dither: bool) {
        self.dither = dither;
    }

    /// Packs the processed samples by draining the read cursor from the start. The cursor is
    /// left just past the last packed sample.
    pub fn packed(&mut self) -> Vec<u8> {
        self.seek_start();
        let end = self.length_in_bytes() * 2;
        let packed = packing::pack(&self.processed[..end]);
        self.read_pos = end;
        packed
    }

    /// Writes the packed data.
    pub fn write_packed<W: Write>(&mut self, writer: &mut W) -> Result<(), SampleError> {
        writer.write_all(&self.packed())?;
        Ok(())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} samples, {} bytes)",
            self.name,
            self.length_in_samples(),
            self.length_in_bytes()
        )
    }
}

/// The sample name for a file: the file name up to the first '.'.
pub fn name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((name, _)) => name.to_string(),
        None => file_name,
    }
}

fn decode(path: &Path, decoder: &dyn PcmDecoder, half_speed: bool) -> Result<Vec<i16>, SampleError> {
    let stream = decoder.open(path, &TargetFormat::decode(half_speed))?;
    read_samples(stream).map_err(stream_error)
}

/// Decode failures inside the stream travel as `io::Error`; unwrap them back into `Decode`.
fn stream_error(err: io::Error) -> SampleError {
    if !err
        .get_ref()
        .is_some_and(|inner| inner.is::<DecodeError>())
    {
        return SampleError::Io(err);
    }

    let kind = err.kind();
    match err.into_inner().map(|inner| inner.downcast::<DecodeError>()) {
        Some(Ok(decode_error)) => SampleError::Decode(*decode_error),
        Some(Err(inner)) => SampleError::Io(io::Error::new(kind, inner)),
        None => SampleError::Io(kind.into()),
    }
}

/// Drains a stream of little-endian signed 16-bit samples. A trailing odd byte is dropped.
pub fn read_samples<R: Read>(mut reader: R) -> io::Result<Vec<i16>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicBool, Ordering};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::audio::sample_source::pcm::PcmStream;
    use crate::audio::sample_source::{DecodeError, SampleSource, SymphoniaDecoder};
    use crate::audio::format::{CHIP_SAMPLE_RATE, HALF_SPEED_SAMPLE_RATE};
    use crate::testutil::write_wav_with_bits;

    /// Hands out fixed PCM bytes, recording the requested rate.
    struct FixedDecoder {
        bytes: Vec<u8>,
        fail: AtomicBool,
        requested_rate: std::sync::Mutex<Option<u32>>,
    }

    impl FixedDecoder {
        fn new(samples: &[i16]) -> FixedDecoder {
            FixedDecoder {
                bytes: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
                fail: AtomicBool::new(false),
                requested_rate: std::sync::Mutex::new(None),
            }
        }
    }

    impl PcmDecoder for FixedDecoder {
        fn open(
            &self,
            _: &Path,
            format: &TargetFormat,
        ) -> Result<Box<dyn Read + Send>, DecodeError> {
            *self.requested_rate.lock().unwrap() = Some(format.sample_rate);
            if self.fail.load(Ordering::Relaxed) {
                return Err(DecodeError::Unsupported("broken".to_string()));
            }
            Ok(Box::new(Cursor::new(self.bytes.clone())))
        }
    }

    /// A mono source that hands out one chunk and then fails.
    struct FailingSource {
        served: bool,
    }

    impl SampleSource for FailingSource {
        fn next_chunk(
            &mut self,
            output: &mut [Vec<f32>],
            max_frames: usize,
        ) -> Result<usize, DecodeError> {
            if self.served {
                return Err(DecodeError::Unsupported("corrupt packet".to_string()));
            }
            self.served = true;
            output[0].clear();
            output[0].extend(std::iter::repeat(0.25).take(max_frames.min(64)));
            Ok(output[0].len())
        }

        fn channel_count(&self) -> u16 {
            1
        }

        fn sample_rate(&self) -> u32 {
            CHIP_SAMPLE_RATE
        }
    }

    /// Streams PCM from a source that breaks partway through.
    struct CorruptDecoder;

    impl PcmDecoder for CorruptDecoder {
        fn open(
            &self,
            _: &Path,
            _: &TargetFormat,
        ) -> Result<Box<dyn Read + Send>, DecodeError> {
            Ok(Box::new(PcmStream::new(FailingSource { served: false })))
        }
    }

    /// A stream whose reads fail with a plain IO error.
    struct BrokenPipeDecoder;

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    impl PcmDecoder for BrokenPipeDecoder {
        fn open(
            &self,
            _: &Path,
            _: &TargetFormat,
        ) -> Result<Box<dyn Read + Send>, DecodeError> {
            Ok(Box::new(BrokenPipe))
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    #[test]
    fn test_from_nibbles() {
        let sample = Sample::from_nibbles(&[0x00, 0xff, 0x8f], "kit");
        assert_eq!(sample.name(), "kit");
        assert_eq!(
            sample.processed(),
            &[-32768, -32768, 28672, 28672, 0, 28672]
        );
        assert!(!sample.can_adjust_volume());
        assert!(sample.source().is_none());
        assert_eq!(sample.work_sample_data(), sample.processed());
    }

    #[test]
    fn test_volume_gating() {
        let mut sample = Sample::from_nibbles(&[0x12; 16], "packed");
        let before = sample.processed().to_vec();

        let result = sample.set_volume_db(6);
        assert!(matches!(result, Err(SampleError::VolumeNotAdjustable(ref name)) if name == "packed"));
        assert_eq!(sample.volume_db(), 0);

        sample.process_samples(&mut rng());
        assert_eq!(sample.processed(), before.as_slice());
    }

    #[test]
    fn test_length_rounding() {
        for (count, bytes) in [(31, 0), (32, 16), (33, 16), (64, 32), (95, 32)] {
            let sample = Sample::from_samples(vec![0; count], "s");
            assert_eq!(sample.length_in_samples(), count);
            assert_eq!(sample.length_in_bytes(), bytes, "{} samples", count);
        }
    }

    #[test]
    fn test_cursor() {
        let mut sample = Sample::from_samples(vec![1, 2, 3], "s");
        assert_eq!(sample.read(), Some(1));
        assert_eq!(sample.read(), Some(2));
        assert_eq!(sample.read(), Some(3));
        assert_eq!(sample.read(), None);
        assert_eq!(sample.read(), None);
        sample.seek_start();
        assert_eq!(sample.read(), Some(1));
    }

    #[test]
    fn test_packed_restarts_from_the_beginning() {
        let mut samples = vec![0i16; 40];
        samples[0] = i16::MAX;
        samples[1] = i16::MIN;
        let mut sample = Sample::from_samples(samples, "s");
        sample.read();
        sample.read();

        let packed = sample.packed();
        assert_eq!(packed.len(), 16);
        // The cursor sits after the 32 packed samples.
        assert_eq!(sample.read(), Some(0));
        assert_eq!(sample.read_pos, 33);
        assert_eq!(packed[0], 0xf0);
        assert!(packed[1..].iter().all(|&b| b == 0x88));
        assert_eq!(sample.packed(), packed);

        let mut written = Vec::new();
        sample.write_packed(&mut written).unwrap();
        assert_eq!(written, packed);
    }

    #[test]
    fn test_packed_round_trip() {
        let nibbles: Vec<u8> = (0..32u8).map(|i| i.wrapping_mul(37)).collect();
        let mut sample = Sample::from_nibbles(&nibbles, "s");
        assert_eq!(sample.packed(), nibbles);
    }

    #[test]
    fn test_read_samples() {
        let samples = read_samples(Cursor::new(vec![0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0x7f])).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
        assert!(read_samples(io::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(name_from_path(Path::new("/kits/kick.wav")), "kick");
        assert_eq!(name_from_path(Path::new("snare.old.flac")), "snare");
        assert_eq!(name_from_path(Path::new("hat")), "hat");
    }

    #[test]
    fn test_from_file_processes() {
        let decoder = FixedDecoder::new(&[0, 100, -8192, 4096, 100, 0]);
        let sample =
            Sample::from_file(Path::new("dir/clap.wav"), &decoder, false, false, &mut rng()).unwrap();

        assert_eq!(sample.name(), "clap");
        assert_eq!(sample.source(), Some(Path::new("dir/clap.wav")));
        assert!(sample.can_adjust_volume());
        assert!(!sample.dither_enabled());
        assert_eq!(sample.processed(), &[-32768, 16384]);
        assert_eq!(sample.work_sample_data(), vec![0, 100, -8192, 4096, 100, 0]);
        assert_eq!(*decoder.requested_rate.lock().unwrap(), Some(CHIP_SAMPLE_RATE));
    }

    #[test]
    fn test_volume_reprocessing() {
        let decoder = FixedDecoder::new(&[-16384, 8192]);
        let mut sample =
            Sample::from_file(Path::new("tom.wav"), &decoder, false, false, &mut rng()).unwrap();
        assert_eq!(sample.processed(), &[-32768, 16384]);

        sample.set_volume_db(-6).unwrap();
        assert_eq!(sample.volume_db(), -6);
        sample.process_samples(&mut rng());
        assert_eq!(sample.processed(), &[-16422, 8211]);

        // At -20 dB the quieter sample falls below the silence threshold.
        sample.set_volume_db(-20).unwrap();
        sample.process_samples(&mut rng());
        assert_eq!(sample.processed(), &[-3276]);

        // Reprocessing without dither is repeatable.
        let first = sample.processed().to_vec();
        sample.process_samples(&mut StdRng::seed_from_u64(99));
        assert_eq!(sample.processed(), first.as_slice());
    }

    #[test]
    fn test_reload() {
        let decoder = FixedDecoder::new(&[-16384, 8192]);
        let mut sample =
            Sample::from_file(Path::new("tom.wav"), &decoder, false, false, &mut rng()).unwrap();

        sample.reload(true, &decoder, &mut rng()).unwrap();
        assert_eq!(*decoder.requested_rate.lock().unwrap(), Some(HALF_SPEED_SAMPLE_RATE));
        assert_eq!(sample.processed(), &[-32768, 16384]);

        // A failed reload keeps the previous data.
        decoder.fail.store(true, Ordering::Relaxed);
        assert!(matches!(
            sample.reload(false, &decoder, &mut rng()),
            Err(SampleError::Decode(DecodeError::Unsupported(_)))
        ));
        assert_eq!(sample.processed(), &[-32768, 16384]);
        assert!(sample.can_adjust_volume());
    }

    #[test]
    fn test_reload_without_source() {
        let decoder = FixedDecoder::new(&[1000; 64]);
        let mut sample = Sample::from_nibbles(&[0x42; 16], "packed");
        sample.reload(false, &decoder, &mut rng()).unwrap();
        assert_eq!(sample.length_in_samples(), 32);
        assert!(decoder.requested_rate.lock().unwrap().is_none());
    }

    #[test]
    fn test_from_wav_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("kick.drum.wav");
        let mut samples = vec![0i16; 200];
        samples[50..150].fill(-8192);
        write_wav_with_bits(path.clone(), vec![samples], CHIP_SAMPLE_RATE, 16).unwrap();

        let sample = Sample::from_file(&path, &SymphoniaDecoder, false, false, &mut rng()).unwrap();
        assert_eq!(sample.name(), "kick");
        // Leading and trailing silence is gone and the plateau is at full scale.
        assert_eq!(sample.length_in_samples(), 100);
        assert!(sample.processed().iter().all(|&s| s == i16::MIN));
    }

    #[test]
    fn test_from_missing_file() {
        let result = Sample::from_file(
            Path::new("/nonexistent/missing.wav"),
            &SymphoniaDecoder,
            true,
            false,
            &mut rng(),
        );
        assert!(matches!(result, Err(SampleError::Decode(_))));
    }

    #[test]
    fn test_decode_failure_inside_stream() {
        let result = Sample::from_file(
            Path::new("broken.wav"),
            &CorruptDecoder,
            false,
            false,
            &mut rng(),
        );
        match result {
            Err(SampleError::Decode(DecodeError::Unsupported(message))) => {
                assert_eq!(message, "corrupt packet")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_failed_reload_inside_stream_keeps_data() {
        let decoder = FixedDecoder::new(&[-16384, 8192]);
        let mut sample =
            Sample::from_file(Path::new("tom.wav"), &decoder, false, false, &mut rng()).unwrap();

        assert!(matches!(
            sample.reload(false, &CorruptDecoder, &mut rng()),
            Err(SampleError::Decode(_))
        ));
        assert_eq!(sample.processed(), &[-32768, 16384]);
        assert_eq!(sample.work_sample_data(), vec![-16384, 8192]);
    }

    #[test]
    fn test_io_failure_inside_stream_stays_io() {
        let result = Sample::from_file(
            Path::new("pipe.wav"),
            &BrokenPipeDecoder,
            false,
            false,
            &mut rng(),
        );
        match result {
            Err(SampleError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
