//! XOR masking of client-to-server payload bytes.
//!
//! Payloads arrive in arbitrary read chunks, so unmasking must be resumable:
//! each chunk continues the 4-byte key rotation from the number of payload
//! bytes already processed for the current frame.

/// Applies the masking key to `buf`, continuing the key rotation as if
/// `offset` payload bytes had already been unmasked.
///
/// Masking is its own inverse, so the same call masks and unmasks.
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4], offset: usize) {
    let rotated = [
        mask[offset & 3],
        mask[(offset + 1) & 3],
        mask[(offset + 2) & 3],
        mask[(offset + 3) & 3],
    ];
    apply_rotated(buf, rotated);
}

/// Applies a pre-rotated key starting at byte 0 of `buf`.
///
/// Works on 4-byte blocks so the optimizer can vectorize the main loop; the
/// remainder is handled byte-wise.
fn apply_rotated(buf: &mut [u8], mask: [u8; 4]) {
    let mut chunks = buf.chunks_exact_mut(4);
    for chunk in &mut chunks {
        chunk[0] ^= mask[0];
        chunk[1] ^= mask[1];
        chunk[2] ^= mask[2];
        chunk[3] ^= mask[3];
    }
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mask() {
        let mask = [0x6D, 0xB6, 0xB2, 0x80];
        let data: Vec<u8> = (0..=255u16).map(|i| (i & 0xFF) as u8).collect();

        let mut masked = data.clone();
        apply_mask(&mut masked, mask, 0);

        for (i, &byte) in masked.iter().enumerate() {
            assert_eq!(byte, data[i] ^ mask[i % 4], "mismatch at index {i}");
        }
    }

    #[test]
    fn test_mask_is_involutive() {
        let mask = [0xAA, 0xBB, 0xCC, 0xDD];
        let original = b"Hello, World! This is a test message with various lengths.";

        let mut data = original.to_vec();
        apply_mask(&mut data, mask, 0);
        assert_ne!(&data[..], &original[..]);

        apply_mask(&mut data, mask, 0);
        assert_eq!(&data[..], &original[..]);
    }

    #[test]
    fn test_offset_resume_matches_single_pass() {
        let mask = [0x12, 0x34, 0x56, 0x78];
        let data: Vec<u8> = (0..100).map(|i| (i * 7) as u8).collect();

        let mut whole = data.clone();
        apply_mask(&mut whole, mask, 0);

        // Every split point must produce the same result as one pass.
        for split in 0..=data.len() {
            let mut parts = data.clone();
            let (head, tail) = parts.split_at_mut(split);
            apply_mask(head, mask, 0);
            apply_mask(tail, mask, split);
            assert_eq!(parts, whole, "split at {split} diverged");
        }
    }

    #[test]
    fn test_short_buffers() {
        let mask = [0x12, 0x34, 0x56, 0x78];

        let mut empty: Vec<u8> = vec![];
        apply_mask(&mut empty, mask, 0);
        assert!(empty.is_empty());

        let mut one = vec![0xAB];
        apply_mask(&mut one, mask, 0);
        assert_eq!(one, vec![0xAB ^ 0x12]);

        let mut three = vec![0xAB, 0xCD, 0xEF];
        apply_mask(&mut three, mask, 1);
        assert_eq!(three, vec![0xAB ^ 0x34, 0xCD ^ 0x56, 0xEF ^ 0x78]);
    }

    #[test]
    fn test_zero_mask_is_identity() {
        let original = b"Test data";
        let mut data = original.to_vec();
        apply_mask(&mut data, [0; 4], 3);
        assert_eq!(&data[..], &original[..]);
    }
}
