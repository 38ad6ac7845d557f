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
use std::io::{self, Read};

use super::traits::SampleSource;

/// Frames pulled from the source per refill.
const CHUNK_FRAMES: usize = 1024;

/// Exposes a mono sample source as a stream of signed 16-bit little-endian bytes.
pub struct PcmStream<S: SampleSource> {
    source: S,
    planar: Vec<Vec<f32>>,
    bytes: Vec<u8>,
    position: usize,
    finished: bool,
}

impl<S: SampleSource> PcmStream<S> {
    pub fn new(source: S) -> Self {
        let channels = source.channel_count() as usize;
        Self {
            source,
            planar: vec![Vec::with_capacity(CHUNK_FRAMES); channels],
            bytes: Vec::with_capacity(CHUNK_FRAMES * 2),
            position: 0,
            finished: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        self.bytes.clear();
        self.position = 0;

        let frames = self.source.next_chunk(&mut self.planar, CHUNK_FRAMES)?;
        if frames == 0 {
            self.finished = true;
            return Ok(());
        }
        for sample in &self.planar[0][..frames] {
            self.bytes.extend_from_slice(&to_i16(*sample).to_le_bytes());
        }
        Ok(())
    }
}

impl<S: SampleSource> Read for PcmStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position >= self.bytes.len() {
            if self.finished {
                return Ok(0);
            }
            self.refill()?;
        }

        let available = &self.bytes[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

/// Converts a float sample in [-1.0, 1.0] to 16 bits, clamping anything outside.
#[inline]
pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
