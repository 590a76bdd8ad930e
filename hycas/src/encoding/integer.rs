//! Varint helpers for the compact expression encoding.
//!
//! Values are appended front to back and decoded back to front, so the first byte of a value
//! (its least significant 7 bits) is the one carrying a clear MSB.

/// Append `value` as base-128 digits, least significant first.
///
/// The first digit is pushed with MSB = 0 and every following digit with MSB = 1, which is
/// what lets [`decode_u64`] find where a value starts when reading from the end.
///
/// ```
/// use hycas::encoding::integer::encode_u64;
/// let mut buf = Vec::new();
/// encode_u64(300, &mut |b| buf.extend_from_slice(b));
/// assert_eq!(buf, [0x2c, 0x82]);
/// ```
pub fn encode_u64<F: FnMut(&[u8])>(mut value: u64, encoder: &mut F) -> u64 {
    let mut byte = (value & 0x7F) as u8;
    let mut size = 1;
    value >>= 7;
    encoder(&[byte]);

    while value > 0 {
        byte = ((value & 0x7F) as u8) | 0x80;
        encoder(&[byte]);
        value >>= 7;
        size += 1;
    }

    size
}

/// Decode one value from the end of `buf` and shrink `buf` to the remaining prefix.
///
/// Returns `None` when the slice runs out before a terminating byte, or when the value does
/// not fit in 64 bits.
pub fn decode_u64(buf: &mut &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut digits = 0;

    loop {
        let (&byte, rest) = buf.split_last()?;
        *buf = rest;
        digits += 1;
        if digits > 10 || (digits == 10 && value >> 57 != 0) {
            return None;
        }
        value = (value << 7) | (byte as u64 & 0x7F);

        if byte & 0x80 == 0 {
            break Some(value);
        }
    }
}

/// Bytes [`encode_u64`] writes for `value`.
pub fn encoded_size_u64(value: u64) -> u64 {
    if value == 0 {
        return 1;
    }
    let significant_bits = (64 - value.leading_zeros()) as u64;
    significant_bits.div_ceil(7)
}

/// Zigzag mapping so that small negative numbers stay short.
pub fn encode_i64<F: FnMut(&[u8])>(value: i64, encoder: &mut F) -> u64 {
    encode_u64(((value << 1) ^ (value >> 63)) as u64, encoder)
}

pub fn decode_i64(buf: &mut &[u8]) -> Option<i64> {
    let raw = decode_u64(buf)?;
    Some((raw >> 1) as i64 ^ -((raw & 1) as i64))
}

/// Append a byte blob followed by its length.
pub fn encode_bytes<F: FnMut(&[u8])>(bytes: &[u8], encoder: &mut F) -> u64 {
    encoder(bytes);
    bytes.len() as u64 + encode_u64(bytes.len() as u64, encoder)
}

/// Take a blob written by [`encode_bytes`] off the end of `buf`.
pub fn decode_bytes<'a>(buf: &mut &'a [u8]) -> Option<&'a [u8]> {
    let length = usize::try_from(decode_u64(buf)?).ok()?;
    let start = buf.len().checked_sub(length)?;
    let (rest, bytes) = buf.split_at(start);
    *buf = rest;
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_values_decode_in_reverse() {
        let mut buf = Vec::new();
        for value in [0_u64, 127, 128, 16384, u64::MAX] {
            encode_u64(value, &mut |b| buf.extend_from_slice(b));
        }
        let mut slice = buf.as_slice();
        for expected in [u64::MAX, 16384, 128, 127, 0] {
            assert_eq!(decode_u64(&mut slice), Some(expected));
        }
        assert!(slice.is_empty());
    }

    #[test]
    fn sizes_match_the_encoder() {
        for value in [0_u64, 1, 127, 128, 300, 1 << 35, u64::MAX] {
            let mut written = 0;
            let size = encode_u64(value, &mut |b| written += b.len());
            assert_eq!(size, written as u64);
            assert_eq!(encoded_size_u64(value), size, "{value}");
        }
    }

    #[test]
    fn zigzag_keeps_signs() {
        let mut buf = Vec::new();
        encode_i64(-3, &mut |b| buf.extend_from_slice(b));
        assert_eq!(buf, [5]);
        let mut slice = buf.as_slice();
        assert_eq!(decode_i64(&mut slice), Some(-3));
    }

    #[test]
    fn truncated_input() {
        let mut slice: &[u8] = &[0x82];
        assert_eq!(decode_u64(&mut slice), None);
        let mut blob: &[u8] = &[1, 2, 5];
        assert_eq!(decode_bytes(&mut blob), None);
    }
}
