//! Target-seeking memory ballast
//!
//! Holds a deque of fixed-size allocations and grows or shrinks it until the
//! owning user's total resident memory matches a target. The further the
//! usage is from the target, the shorter the sleep between adjustments.

use crate::memory::{memory_usage_with, current_user};
use std::collections::VecDeque;
use std::time::Duration;
use sysinfo::{System, Users};
use tracing::info;

/// Default ballast block: 1M u64 values, 8 MiB resident once touched
pub const DEFAULT_BLOCK_LEN: usize = 1_000_000;

/// Settings for the memory matcher
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Target total resident memory for the user, in bytes
    pub target: u64,
    /// Number of u64 elements per ballast block
    pub block_len: usize,
    /// Shortest sleep between adjustments
    pub sleep_min: Duration,
    /// Longest sleep between adjustments
    pub sleep_max: Duration,
}

impl MatcherConfig {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            block_len: DEFAULT_BLOCK_LEN,
            sleep_min: Duration::from_secs(1),
            sleep_max: Duration::from_secs(30),
        }
    }

    fn block_bytes(&self) -> u64 {
        (self.block_len * std::mem::size_of::<u64>()) as u64
    }

    /// Sleep duration interpolated linearly between (0 blocks off target,
    /// sleep_max) and (10+ blocks off target, sleep_min)
    fn sleep_for(&self, blocks_off: f64) -> Duration {
        let x = blocks_off.clamp(0.0, 10.0) / 10.0;
        let max = self.sleep_max.as_secs_f64();
        let min = self.sleep_min.as_secs_f64();
        Duration::from_secs_f64(max + (min - max) * x)
    }
}

/// Allocate one ballast block and touch every page so it is resident
fn ballast_block(len: usize) -> Vec<u64> {
    (0..len as u64).collect()
}

/// Run the matcher loop forever
pub fn match_memory_usage(config: &MatcherConfig) -> ! {
    let user = current_user();
    info!(
        "Target memory: {}",
        humansize::format_size(config.target, humansize::BINARY)
    );
    let block_bytes = config.block_bytes();
    let mut ballast: VecDeque<Vec<u64>> = VecDeque::new();
    let mut system = System::new_all();
    let users = Users::new_with_refreshed_list();
    loop {
        system.refresh_all();
        let used = memory_usage_with(&system, &users, &user);
        info!(
            "Current memory used by {}: {} of which {} is matcher ballast",
            user,
            humansize::format_size(used, humansize::BINARY),
            humansize::format_size(block_bytes * ballast.len() as u64, humansize::BINARY),
        );
        let diff = (config.target as f64 - used as f64) / block_bytes as f64;
        if diff > 0.0 {
            info!("Consuming more memory ...");
            ballast.push_back(ballast_block(config.block_len));
            std::thread::sleep(config.sleep_for(diff));
        } else {
            let count = ((-diff).ceil() as usize).min(ballast.len());
            info!("Releasing memory ...");
            for _ in 0..count {
                ballast.pop_back();
            }
            std::thread::sleep(config.sleep_for(count as f64));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_interpolation_bounds() {
        let config = MatcherConfig::new(1 << 30);
        assert_eq!(config.sleep_for(0.0), config.sleep_max);
        assert_eq!(config.sleep_for(10.0), config.sleep_min);
        assert_eq!(config.sleep_for(100.0), config.sleep_min);
        let middle = config.sleep_for(5.0);
        assert!(middle > config.sleep_min && middle < config.sleep_max);
    }

    #[test]
    fn test_block_is_resident_sized() {
        let config = MatcherConfig::new(0);
        let block = ballast_block(config.block_len);
        assert_eq!(block.len(), DEFAULT_BLOCK_LEN);
        assert_eq!(config.block_bytes(), 8_000_000);
    }
}
