//! Packed bit sets used for per-position sequence masks (repeats, N residues).

#[inline]
const fn calculate_bit_position(bit_index: usize) -> (usize, u8) {
    (bit_index >> 3, 1 << (bit_index & 0x07))
}

/// Allocate a zeroed bitmap able to hold `bit_count` bits
#[must_use]
pub fn with_capacity(bit_count: usize) -> Vec<u8> {
    vec![0; bit_count.div_ceil(8)]
}

/// Test if a bit is set at the given index; out-of-range bits read as clear
pub fn test_bit(bitmap: &[u8], bit_index: usize) -> bool {
    let (byte_index, bit_mask) = calculate_bit_position(bit_index);
    bitmap
        .get(byte_index)
        .is_some_and(|byte| byte & bit_mask != 0)
}

/// Set a bit to 1 at the given index
pub fn set_bit(bitmap: &mut [u8], bit_index: usize) {
    let (byte_index, bit_mask) = calculate_bit_position(bit_index);
    bitmap[byte_index] |= bit_mask;
}

/// Count the set bits in `[from, to)`
pub fn count_range(bitmap: &[u8], from: usize, to: usize) -> usize {
    (from..to).filter(|&i| test_bit(bitmap, i)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_bit_position() {
        assert_eq!(calculate_bit_position(0), (0, 1));
        assert_eq!(calculate_bit_position(7), (0, 128));
        assert_eq!(calculate_bit_position(8), (1, 1));
        assert_eq!(calculate_bit_position(16), (2, 1));
    }

    #[test]
    fn test_with_capacity_rounds_up() {
        assert_eq!(with_capacity(0).len(), 0);
        assert_eq!(with_capacity(1).len(), 1);
        assert_eq!(with_capacity(8).len(), 1);
        assert_eq!(with_capacity(9).len(), 2);
    }

    #[test]
    fn test_set_bits() {
        let mut bitmap = with_capacity(16);

        set_bit(&mut bitmap, 0);
        set_bit(&mut bitmap, 3);
        set_bit(&mut bitmap, 8);
        assert_eq!(bitmap[0], 0b00001001);
        assert_eq!(bitmap[1], 0b00000001);
        assert!(test_bit(&bitmap, 3));
        assert!(!test_bit(&bitmap, 4));
    }

    #[test]
    fn test_out_of_range_reads_clear() {
        let bitmap = [0xffu8];
        assert!(test_bit(&bitmap, 7));
        assert!(!test_bit(&bitmap, 8));
        assert!(!test_bit(&bitmap, 1000));
    }

    #[test]
    fn test_count_range() {
        let mut bitmap = with_capacity(32);
        for i in [1, 5, 9, 20, 31] {
            set_bit(&mut bitmap, i);
        }
        assert_eq!(count_range(&bitmap, 0, 32), 5);
        assert_eq!(count_range(&bitmap, 2, 21), 3);
        assert_eq!(count_range(&bitmap, 10, 20), 0);
    }
}
