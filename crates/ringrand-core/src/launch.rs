//! Launch geometry selection.
//!
//! Kernels in this crate index their output by the global work-item id, so the
//! decomposition must cover the problem size exactly: no padding threads and no
//! bounds checks on the device. [`LaunchPolicy`] finds the largest power-of-two
//! block size (up to a limit) that divides the work-item count.

use crate::error::{RandomError, Result};

/// Default upper bound for the block (work-group) size.
pub const DEFAULT_MAX_LOCAL_SIZE: u32 = 32;

/// A one-dimensional launch decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    /// Number of blocks.
    pub grid: u32,
    /// Threads per block.
    pub block: u32,
}

impl LaunchGeometry {
    /// Creates a geometry from explicit grid and block sizes.
    #[must_use]
    pub fn new(grid: u32, block: u32) -> Self {
        Self { grid, block }
    }

    /// One work item per block, the "no local size" decomposition.
    #[must_use]
    pub fn flat(work_items: u32) -> Self {
        Self {
            grid: work_items,
            block: 1,
        }
    }

    /// Total number of work items.
    #[must_use]
    pub fn work_items(&self) -> u64 {
        self.grid as u64 * self.block as u64
    }
}

impl std::fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "grid={} block={}", self.grid, self.block)
    }
}

/// Chooses block sizes by power-of-two divisor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchPolicy {
    max_local: u32,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            max_local: DEFAULT_MAX_LOCAL_SIZE,
        }
    }
}

impl LaunchPolicy {
    /// Creates a policy with the given block size limit.
    ///
    /// The limit must be a nonzero power of two.
    pub fn new(max_local: u32) -> Result<Self> {
        if !max_local.is_power_of_two() {
            return Err(RandomError::InvalidConfig(format!(
                "max local size must be a power of two, got {}",
                max_local
            )));
        }
        Ok(Self { max_local })
    }

    /// Returns the block size limit.
    #[must_use]
    pub fn max_local(&self) -> u32 {
        self.max_local
    }

    /// Computes a geometry whose `grid * block` equals `work_items` exactly.
    pub fn geometry(&self, work_items: usize) -> Result<LaunchGeometry> {
        if work_items == 0 {
            return Err(RandomError::InvalidConfig(
                "cannot launch zero work items".to_string(),
            ));
        }
        let mut grid = u32::try_from(work_items).map_err(|_| {
            RandomError::InvalidConfig(format!(
                "{} work items exceed the 32-bit grid limit",
                work_items
            ))
        })?;

        let mut block = 1u32;
        while grid & 1 == 0 && block < self.max_local {
            grid >>= 1;
            block <<= 1;
        }

        Ok(LaunchGeometry { grid, block })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_count_uses_unit_blocks() {
        let geometry = LaunchPolicy::default().geometry(5).unwrap();
        assert_eq!(geometry, LaunchGeometry::new(5, 1));
    }

    #[test]
    fn test_block_capped_at_limit() {
        let geometry = LaunchPolicy::default().geometry(1024).unwrap();
        assert_eq!(geometry, LaunchGeometry::new(32, 32));

        let geometry = LaunchPolicy::new(256).unwrap().geometry(1024).unwrap();
        assert_eq!(geometry, LaunchGeometry::new(4, 256));
    }

    #[test]
    fn test_partial_power_of_two() {
        // 24 = 3 * 8
        let geometry = LaunchPolicy::default().geometry(24).unwrap();
        assert_eq!(geometry, LaunchGeometry::new(3, 8));
        assert_eq!(geometry.work_items(), 24);
    }

    #[test]
    fn test_geometry_covers_exactly() {
        let policy = LaunchPolicy::default();
        for n in 1..2000usize {
            let g = policy.geometry(n).unwrap();
            assert_eq!(g.work_items(), n as u64);
            assert!(g.block.is_power_of_two());
            assert!(g.block <= policy.max_local());
        }
    }

    #[test]
    fn test_rejects_zero_and_bad_limits() {
        assert!(LaunchPolicy::default().geometry(0).is_err());
        assert!(LaunchPolicy::new(0).is_err());
        assert!(LaunchPolicy::new(48).is_err());
    }

    #[test]
    fn test_flat_geometry() {
        let g = LaunchGeometry::flat(7);
        assert_eq!(g.block, 1);
        assert_eq!(g.work_items(), 7);
        assert_eq!(g.to_string(), "grid=7 block=1");
    }
}
