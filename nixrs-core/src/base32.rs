//! Nix flavour of base-32 used for store path hashes.
//!
//! The alphabet omits `e`, `o`, `u` and `t` and the encoding is written
//! starting from the last byte of the input.

use thiserror::Error;

const BASE32_CHARS: [u8; 32] = *b"0123456789abcdfghijklmnpqrsvwxyz";
const BASE32_CHARS_REVERSE: [u8; 256] = {
    let mut ret = [0xFFu8; 256];
    let mut idx = 0u8;
    while idx < 32 {
        let ch = BASE32_CHARS[idx as usize];
        ret[ch as usize] = idx;
        idx += 1;
    }
    ret
};

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Base32Error {
    #[error("invalid base-32 symbol at {position}")]
    Symbol { position: usize },
    #[error("non-zero trailing bits in base-32 string")]
    Trailing,
}

impl Base32Error {
    pub fn position(&self) -> usize {
        match self {
            Base32Error::Symbol { position } => *position,
            Base32Error::Trailing => 0,
        }
    }
}

pub const fn encode_len(len: usize) -> usize {
    (8 * len).div_ceil(5)
}

pub const fn decode_len(len: usize) -> usize {
    5 * len / 8
}

pub fn encode_mut(input: &[u8], output: &mut [u8]) {
    assert_eq!(output.len(), encode_len(input.len()));
    let len = output.len();
    for (n, out) in output.iter_mut().enumerate() {
        let b = (len - n - 1) * 5;
        let i = b / 8;
        let j = b % 8;
        let low = input[i] >> j;
        let high = if i + 1 < input.len() {
            input[i + 1].checked_shl(8 - j as u32).unwrap_or(0)
        } else {
            0
        };
        *out = BASE32_CHARS[((low | high) & 0x1f) as usize];
    }
}

pub fn encode_string(input: &[u8]) -> String {
    let mut output = vec![0u8; encode_len(input.len())];
    encode_mut(input, &mut output);
    output.into_iter().map(char::from).collect()
}

pub fn decode_mut(input: &[u8], output: &mut [u8]) -> Result<(), Base32Error> {
    assert_eq!(output.len(), decode_len(input.len()));
    output.fill(0);
    let len = input.len();
    for (n, ch) in input.iter().rev().enumerate() {
        let digit = BASE32_CHARS_REVERSE[*ch as usize];
        if digit == 0xFF {
            return Err(Base32Error::Symbol {
                position: len - n - 1,
            });
        }
        let b = n * 5;
        let i = b / 8;
        let value = u16::from(digit) << (b % 8);
        for (idx, part) in [(i, value as u8), (i + 1, (value >> 8) as u8)] {
            if part == 0 {
                continue;
            }
            match output.get_mut(idx) {
                Some(out) => *out |= part,
                None => return Err(Base32Error::Trailing),
            }
        }
    }
    Ok(())
}
