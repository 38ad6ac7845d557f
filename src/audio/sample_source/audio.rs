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
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::error::DecodeError;
use super::traits::SampleSource;

/// A sample source that reads audio files (WAV, FLAC, AIFF, etc.) through symphonia and
/// yields planar f32 samples in [-1.0, 1.0].
pub struct AudioSampleSource {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    /// Decoded frames that have not been handed out yet, one Vec per channel.
    pending: Vec<Vec<f32>>,
    /// Scratch buffer decoded packets are converted into.
    scratch: Option<AudioBuffer<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl SampleSource for AudioSampleSource {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, DecodeError> {
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

        while !self.is_finished && self.pending_frames() < max_frames {
            if !self.decode_next_packet()? {
                self.is_finished = true;
            }
        }

        let to_copy = self.pending_frames().min(max_frames);
        for (out, pending) in output.iter_mut().zip(self.pending.iter_mut()) {
            out.extend(pending.drain(..to_copy));
        }
        Ok(to_copy)
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioSampleSource {
    /// Creates a new audio sample source from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        // Include the path in the error so the user sees which file failed.
        let file = File::open(path).map_err(|e| {
            DecodeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|e| DecodeError::Unsupported(format!("'{}': {}", path.display(), e)))?;
        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                DecodeError::Unsupported(format!("'{}': no audio track found", path.display()))
            })?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params.sample_rate.ok_or_else(|| {
            DecodeError::Unsupported(format!("'{}': sample rate not specified", path.display()))
        })?;

        let decoder = get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(format!("'{}': {}", path.display(), e)))?;

        let mut source = Self {
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            pending: Vec::new(),
            scratch: None,
            channels: params.channels.map(|c| c.count() as u16).unwrap_or(0),
            sample_rate,
        };

        // Some containers don't report a channel layout. Decode the first packet to find out.
        if source.channels == 0 {
            if !source.decode_next_packet()? || source.pending.is_empty() {
                return Err(DecodeError::Unsupported(format!(
                    "'{}': channels not specified",
                    path.display()
                )));
            }
            source.channels = source.pending.len() as u16;
        } else {
            source.pending = vec![Vec::new(); source.channels as usize];
        }

        debug!(
            path = ?path,
            sample_rate = source.sample_rate,
            channels = source.channels,
            "Opened audio source"
        );

        Ok(source)
    }

    fn pending_frames(&self) -> usize {
        self.pending.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Reads the next packet, treating the end of stream as `None`.
    fn read_next_packet(&mut self) -> Result<Option<Packet>, DecodeError> {
        loop {
            match self.format_reader.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => return Ok(Some(packet)),
                Ok(_) => continue,
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None)
                }
                // Some readers report a decode error at EOF instead of an IO error.
                Err(SymphoniaError::DecodeError(_)) => return Ok(None),
                Err(e) => return Err(DecodeError::Audio(e)),
            }
        }
    }

    /// Decodes one packet into the pending buffers. Returns false at the end of the stream.
    fn decode_next_packet(&mut self) -> Result<bool, DecodeError> {
        let packet = match self.read_next_packet()? {
            Some(packet) => packet,
            None => return Ok(false),
        };

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is skipped; the stream itself can continue.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(err = e, "Skipping undecodable packet");
                return Ok(true);
            }
            Err(e) => return Err(DecodeError::Audio(e)),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        if !matches!(&self.scratch, Some(buf) if buf.capacity() as u64 >= capacity && *buf.spec() == spec)
        {
            self.scratch = None;
        }
        let scratch = self
            .scratch
            .get_or_insert_with(|| AudioBuffer::<f32>::new(capacity, spec));
        decoded.convert(scratch);

        let channels = spec.channels.count();
        if self.pending.len() != channels {
            self.pending.resize(channels, Vec::new());
        }
        for (ch_idx, pending) in self.pending.iter_mut().enumerate() {
            pending.extend_from_slice(scratch.chan(ch_idx));
        }
        Ok(true)
    }
}
