//! Track number allocation.

use std::collections::BTreeSet;

/// Hands out the lowest free track number at or above a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberAllocator {
    start_at: u32,
}

impl NumberAllocator {
    pub fn new(start_at: u32) -> Self {
        Self { start_at }
    }

    pub fn start_at(&self) -> u32 {
        self.start_at
    }

    /// Smallest number `>= start_at` that is neither reserved nor consumed.
    ///
    /// `reserved` holds explicit numbers of specs not yet matched, so
    /// auto-numbering never steals a number a pending spec is waiting for.
    pub fn next(&self, reserved: &BTreeSet<u32>, consumed: &BTreeSet<u32>) -> u32 {
        let mut candidate = self.start_at;
        while reserved.contains(&candidate) || consumed.contains(&candidate) {
            candidate += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(nums: &[u32]) -> BTreeSet<u32> {
        nums.iter().copied().collect()
    }

    #[test]
    fn test_empty_sets_yield_the_floor() {
        assert_eq!(NumberAllocator::new(4).next(&set(&[]), &set(&[])), 4);
    }

    #[test]
    fn test_skips_reserved_and_consumed_numbers() {
        let allocator = NumberAllocator::new(4);
        assert_eq!(allocator.next(&set(&[4]), &set(&[])), 5);
        assert_eq!(allocator.next(&set(&[5]), &set(&[4])), 6);
        assert_eq!(allocator.next(&set(&[7]), &set(&[4, 5, 6])), 8);
    }

    #[test]
    fn test_fills_lowest_gap_first() {
        let allocator = NumberAllocator::new(1);
        assert_eq!(allocator.next(&set(&[]), &set(&[1, 2, 4])), 3);
    }

    #[test]
    fn test_numbers_below_the_floor_are_irrelevant() {
        let allocator = NumberAllocator::new(8);
        assert_eq!(allocator.next(&set(&[1, 2]), &set(&[3])), 8);
    }
}
