//! Hamming(7,4) codec used for every programmed page.
//!
//! A codeword is laid out as `[d0, d1, d2, d3, p1, p2, p3]` with
//! `p1 = d0^d1^d3`, `p2 = d0^d2^d3`, `p3 = d1^d2^d3`. The decoder reads the
//! three-bit syndrome `s1 + 2*s2 + 4*s3` and maps it to the data bit whose
//! parity pattern it matches (3 -> d0, 5 -> d1, 6 -> d2, 7 -> d3). A single
//! flip in a data bit is corrected. A single flip in a parity bit yields a
//! one-hot syndrome and leaves the data untouched. Multi-bit errors are not
//! detected and may be silently miscorrected.

use crate::config::{Bit, CODE_BITS_PER_GROUP, DATA_BITS_PER_GROUP};
use crate::error::{FtlError, Result};

fn parity(d: &[Bit]) -> [Bit; 3] {
    [d[0] ^ d[1] ^ d[3], d[0] ^ d[2] ^ d[3], d[1] ^ d[2] ^ d[3]]
}

fn syndrome_to_data_bit(syndrome: usize) -> Option<usize> {
    match syndrome {
        3 => Some(0),
        5 => Some(1),
        6 => Some(2),
        7 => Some(3),
        // 0: clean, 1/2/4: the parity bit itself flipped
        _ => None,
    }
}

pub fn encode(data: &[Bit]) -> Result<Vec<Bit>> {
    if data.len() % DATA_BITS_PER_GROUP != 0 {
        return Err(FtlError::MalformedInput {
            len: data.len(),
            group: DATA_BITS_PER_GROUP,
        });
    }

    let mut out = Vec::with_capacity(data.len() / DATA_BITS_PER_GROUP * CODE_BITS_PER_GROUP);
    for group in data.chunks_exact(DATA_BITS_PER_GROUP) {
        out.extend_from_slice(group);
        out.extend_from_slice(&parity(group));
    }
    Ok(out)
}

pub fn decode(code: &[Bit]) -> Result<Vec<Bit>> {
    if code.len() % CODE_BITS_PER_GROUP != 0 {
        return Err(FtlError::MalformedInput {
            len: code.len(),
            group: CODE_BITS_PER_GROUP,
        });
    }

    let mut out = Vec::with_capacity(code.len() / CODE_BITS_PER_GROUP * DATA_BITS_PER_GROUP);
    for word in code.chunks_exact(CODE_BITS_PER_GROUP) {
        let (d, p) = word.split_at(DATA_BITS_PER_GROUP);
        let expected = parity(d);
        let error_pos = (expected[0] ^ p[0]) as usize
            + (expected[1] ^ p[1]) as usize * 2
            + (expected[2] ^ p[2]) as usize * 4;

        let mut d = [d[0], d[1], d[2], d[3]];
        if let Some(bit) = syndrome_to_data_bit(error_pos) {
            d[bit] ^= 1;
        }
        out.extend_from_slice(&d);
    }
    Ok(out)
}
