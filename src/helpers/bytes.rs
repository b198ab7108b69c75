//! Little-endian decoding of fixed-width integers and floats from byte slices.
//! Callers slice the input; every function reads from the start of the slice it is given.

macro_rules! le_decoder {
    ($($name:ident => $kind:ty),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(bytes: &[u8]) -> $kind {
                let mut buffer = [0u8; std::mem::size_of::<$kind>()];
                buffer.copy_from_slice(&bytes[..std::mem::size_of::<$kind>()]);
                <$kind>::from_le_bytes(buffer)
            }
        )*
    };
}

le_decoder! {
    to_u16 => u16,
    to_u32 => u32,
    to_u64 => u64,
    to_f64 => f64,
}

/// Reads a 32-bit sector or record index as `usize`.
#[inline]
pub(crate) fn to_usize(bytes: &[u8]) -> usize {
    to_u32(bytes) as usize
}

/// Splits `bytes` into 4-byte little-endian indexes. A trailing partial chunk is ignored.
pub(crate) fn to_usize_iter(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(to_usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian() {
        assert_eq!(to_u16(&[0x34, 0x12, 0xFF]), 0x1234);
        assert_eq!(to_u32(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(to_f64(&1.5f64.to_le_bytes()), 1.5);
    }

    #[test]
    fn usize_iter_drops_partial_chunk() {
        let indexes: Vec<usize> = to_usize_iter(&[1, 0, 0, 0, 2, 0, 0, 0, 9]).collect();
        assert_eq!(indexes, vec![1, 2]);
    }
}
