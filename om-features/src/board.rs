//! Occupancy bitmask <-> board plane.

/// Square `size × size` plane of `f32` cells, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    size: usize,
    cells: Vec<f32>,
}

impl Plane {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            cells: vec![0.0; size * size],
        }
    }

    /// Wrap row-major cells. Panics if `cells.len() != size * size`.
    pub fn from_cells(size: usize, cells: Vec<f32>) -> Self {
        assert_eq!(cells.len(), size * size, "plane cell count must be size²");
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, v: f32) {
        self.cells[row * self.size + col] = v;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<f32> {
        self.cells
    }
}

/// Expand `occupancy` into a plane: bit `i` lands on `(i / size, i % size)`.
///
/// Bits at or above `size²` are ignored.
pub fn decode_board(occupancy: u64, size: usize) -> Plane {
    let mut p = Plane::zeros(size);
    for (i, cell) in p.cells.iter_mut().enumerate().take(64) {
        if (occupancy >> i) & 1 == 1 {
            *cell = 1.0;
        }
    }
    p
}

/// Inverse of [`decode_board`] for 0/1 planes: any non-zero cell sets its bit.
pub fn encode_board(plane: &Plane) -> u64 {
    let mut x = 0u64;
    for (i, &v) in plane.cells.iter().enumerate().take(64) {
        if v != 0.0 {
            x |= 1u64 << i;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_index_is_row_major() {
        // bit 0 -> (0,0), bit 7 -> (0,7), bit 8 -> (1,0), bit 63 -> (7,7)
        let occ = 1u64 | (1u64 << 7) | (1u64 << 8) | (1u64 << 63);
        let p = decode_board(occ, 8);
        assert_eq!(p.get(0, 0), 1.0);
        assert_eq!(p.get(0, 7), 1.0);
        assert_eq!(p.get(1, 0), 1.0);
        assert_eq!(p.get(7, 7), 1.0);
        assert_eq!(p.as_slice().iter().sum::<f32>(), 4.0);
    }

    #[test]
    fn empty_and_full_masks() {
        assert!(decode_board(0, 8).as_slice().iter().all(|&v| v == 0.0));
        assert!(decode_board(u64::MAX, 8).as_slice().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn high_bits_are_ignored_on_small_boards() {
        let p = decode_board(u64::MAX, 4);
        assert_eq!(p.as_slice().len(), 16);
        assert_eq!(encode_board(&p), 0xFFFF);
    }

    #[test]
    fn encode_inverts_decode() {
        let occ = 0x0000_0018_1800_0000u64;
        assert_eq!(encode_board(&decode_board(occ, 8)), occ);
    }
}
