//! Shared types used across llmgrid crates.

use serde::{Deserialize, Serialize};

/// A resource vector: requested by a workload, or offered/committed by a node.
///
/// CPU is expressed in millicores, memory in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu: u64,
    pub memory: u64,
    pub gpu_count: u32,
}

impl ResourceSpec {
    pub const fn new(cpu: u64, memory: u64, gpu_count: u32) -> Self {
        Self {
            cpu,
            memory,
            gpu_count,
        }
    }

    /// A capacity vector that never runs out.
    pub const fn unbounded() -> Self {
        Self {
            cpu: u64::MAX,
            memory: u64::MAX,
            gpu_count: u32::MAX,
        }
    }

    pub fn saturating_add(&self, other: &ResourceSpec) -> ResourceSpec {
        ResourceSpec {
            cpu: self.cpu.saturating_add(other.cpu),
            memory: self.memory.saturating_add(other.memory),
            gpu_count: self.gpu_count.saturating_add(other.gpu_count),
        }
    }

    pub fn saturating_sub(&self, other: &ResourceSpec) -> ResourceSpec {
        ResourceSpec {
            cpu: self.cpu.saturating_sub(other.cpu),
            memory: self.memory.saturating_sub(other.memory),
            gpu_count: self.gpu_count.saturating_sub(other.gpu_count),
        }
    }

    /// True if every dimension of `self` is at most the same dimension of `available`.
    pub fn fits_within(&self, available: &ResourceSpec) -> bool {
        self.cpu <= available.cpu
            && self.memory <= available.memory
            && self.gpu_count <= available.gpu_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_checks_every_dimension() {
        let free = ResourceSpec::new(4000, 16 << 30, 1);

        assert!(ResourceSpec::new(1000, 2 << 30, 1).fits_within(&free));
        assert!(!ResourceSpec::new(1000, 2 << 30, 2).fits_within(&free));
        assert!(!ResourceSpec::new(5000, 2 << 30, 0).fits_within(&free));
        assert!(!ResourceSpec::new(1000, 32 << 30, 0).fits_within(&free));
    }

    #[test]
    fn unbounded_absorbs_commitments() {
        let committed = ResourceSpec::new(10_000, 64 << 30, 8);
        let free = ResourceSpec::unbounded().saturating_sub(&committed);
        assert!(ResourceSpec::new(1_000_000, 1 << 40, 1000).fits_within(&free));
    }

    #[test]
    fn saturating_sub_never_underflows() {
        let a = ResourceSpec::new(100, 100, 0);
        let b = ResourceSpec::new(200, 50, 1);
        assert_eq!(a.saturating_sub(&b), ResourceSpec::new(0, 50, 0));
    }
}
