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

//! The packed wave format: two 4-bit samples per byte, high nibble first, with no header.

/// Packed data always comes in whole multiples of this many bytes.
pub const PACKED_ALIGNMENT: usize = 0x10;

/// Distance between two adjacent 4-bit levels in the 16-bit domain.
pub const QUANTIZATION_STEP: i32 = 1 << 12;

/// Number of packed bytes `sample_count` samples occupy once truncated to the alignment.
pub fn packed_len(sample_count: usize) -> usize {
    let len = sample_count / 2;
    len - len % PACKED_ALIGNMENT
}

/// Quantizes a 16-bit sample to its 4-bit level.
#[inline]
pub fn quantize(sample: i16) -> u8 {
    ((sample as i32 + 0x8000) >> 12) as u8
}

/// Combines two samples into one packed byte.
#[inline]
pub fn pack_pair(first: i16, second: i16) -> u8 {
    (quantize(first) << 4) | quantize(second)
}

/// Packs a whole buffer, dropping whatever does not fill a complete aligned block.
pub fn pack(samples: &[i16]) -> Vec<u8> {
    samples
        .chunks_exact(2)
        .take(packed_len(samples.len()))
        .map(|pair| pack_pair(pair[0], pair[1]))
        .collect()
}

/// Maps one nibble, already shifted into the high half of a byte, back to 16 bits.
#[inline]
fn expand(shifted: u8) -> i16 {
    (shifted.wrapping_sub(0x80) as i8 as i16) * 256
}

/// Splits a packed byte into its two nibbles, each shifted into the high half of a byte.
#[inline]
pub fn split(byte: u8) -> (u8, u8) {
    (byte & 0xf0, (byte & 0x0f) << 4)
}

/// Unpacks to signed 16-bit samples centered on zero.
pub fn unpack_i16(packed: &[u8]) -> Vec<i16> {
    packed
        .iter()
        .flat_map(|&byte| {
            let (high, low) = split(byte);
            [expand(high), expand(low)]
        })
        .collect()
}

/// Unpacks to unsigned 8-bit samples for playback at the chip rate.
pub fn unpack_u8(packed: &[u8]) -> Vec<u8> {
    packed
        .iter()
        .flat_map(|&byte| {
            let (high, low) = split(byte);
            [high, low]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_len_rounds_down() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(31), 0);
        assert_eq!(packed_len(32), 16);
        assert_eq!(packed_len(33), 16);
        assert_eq!(packed_len(63), 16);
        assert_eq!(packed_len(64), 32);
        for count in [31usize, 32, 33, 1000, 4097] {
            let len = packed_len(count);
            assert_eq!(len % 16, 0);
            assert!(len <= count / 2);
        }
    }

    #[test]
    fn test_quantize_levels() {
        assert_eq!(quantize(i16::MIN), 0x0);
        assert_eq!(quantize(-1), 0x7);
        assert_eq!(quantize(0), 0x8);
        assert_eq!(quantize(4095), 0x8);
        assert_eq!(quantize(4096), 0x9);
        assert_eq!(quantize(i16::MAX), 0xf);
    }

    #[test]
    fn test_pack_pair_is_high_nibble_first() {
        assert_eq!(pack_pair(i16::MIN, i16::MAX), 0x0f);
        assert_eq!(pack_pair(i16::MAX, i16::MIN), 0xf0);
        assert_eq!(pack_pair(0, -1), 0x87);
    }

    #[test]
    fn test_pack_truncates_to_alignment() {
        assert!(pack(&[0; 31]).is_empty());
        assert_eq!(pack(&[0; 33]), vec![0x88; 16]);
        assert_eq!(pack(&[0; 70]).len(), 32);
    }

    #[test]
    fn test_unpack_i16_convention() {
        assert_eq!(unpack_i16(&[0x00]), vec![-32768, -32768]);
        // (0xf0 - 0x80) * 256 for both nibbles.
        assert_eq!(unpack_i16(&[0xff]), vec![0x70 * 256, 0x70 * 256]);
        assert_eq!(unpack_i16(&[0xff]), vec![28672, 28672]);
        assert_eq!(unpack_i16(&[0x80]), vec![0, -32768]);
        assert_eq!(unpack_i16(&[0x18]), vec![-28672, 0]);
        assert!(unpack_i16(&[]).is_empty());
    }

    #[test]
    fn test_unpack_u8() {
        assert_eq!(unpack_u8(&[0x12, 0xf0]), vec![0x10, 0x20, 0xf0, 0x00]);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let mut samples: Vec<i16> = (0..60).map(|i| (i * 1021 - 32768) as i16).collect();
        samples.extend([i16::MIN, i16::MAX, 0, -1]);
        let unpacked = unpack_i16(&pack(&samples));
        assert_eq!(unpacked.len(), samples.len());
        for (original, restored) in samples.iter().zip(&unpacked) {
            let error = *original as i32 - *restored as i32;
            assert!(
                (0..QUANTIZATION_STEP).contains(&error),
                "{} came back as {}",
                original,
                restored
            );
        }
    }

    #[test]
    fn test_unpacked_levels_pack_back_identically() {
        let packed: Vec<u8> = (0..=255u8).cycle().take(32).collect();
        assert_eq!(pack(&unpack_i16(&packed)), packed);
    }
}
