//! Throttled keyword filter for the spark-submit client log
//!
//! The yarn client repeats its status lines every second for the lifetime
//! of the application. The filter keeps a line when it contains a tracked
//! keyword whose group interval has elapsed since the keyword last printed.
//! Keywords of a mutually exclusive group reset each other, so a state
//! transition (ACCEPTED to RUNNING) always prints immediately.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A set of keywords sharing an emission interval
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    /// Substrings matched against the trimmed, lowercased line
    pub keywords: Vec<&'static str>,
    /// Minimum time between emissions of the same keyword
    pub interval: Duration,
    /// Seeing one keyword resets the timers of its siblings
    pub mutually_exclusive: bool,
}

/// Stateful filter over the spark-submit stderr stream
#[derive(Debug)]
pub struct LogFilter {
    groups: Vec<KeywordGroup>,
    last_emitted: HashMap<&'static str, Instant>,
}

impl LogFilter {
    pub fn new(groups: Vec<KeywordGroup>) -> Self {
        Self {
            groups,
            last_emitted: HashMap::new(),
        }
    }

    /// The filter tuned for the yarn client's chatter
    pub fn spark_default() -> Self {
        Self::new(vec![
            KeywordGroup {
                keywords: vec!["warn client", "uploading"],
                interval: Duration::ZERO,
                mutually_exclusive: false,
            },
            KeywordGroup {
                keywords: vec!["queue: ", "tracking url: "],
                interval: Duration::from_secs(24 * 3600),
                mutually_exclusive: false,
            },
            KeywordGroup {
                keywords: vec!["exception", "user class threw", "caused by"],
                interval: Duration::from_secs(1),
                mutually_exclusive: false,
            },
            KeywordGroup {
                keywords: vec!["state: accepted", "state: running", "state: finished"],
                interval: Duration::from_secs(600),
                mutually_exclusive: true,
            },
            KeywordGroup {
                keywords: vec![
                    "final status: undefined",
                    "final status: succeeded",
                    "final status: failed",
                ],
                interval: Duration::from_secs(180),
                mutually_exclusive: true,
            },
        ])
    }

    /// Forget all emission timestamps (a new submission starts fresh)
    pub fn reset(&mut self) {
        self.last_emitted.clear();
    }

    /// Whether the line should be kept, updating the throttle state
    pub fn keep(&mut self, line: &str) -> bool {
        self.keep_at(line, Instant::now())
    }

    /// Test seam: like [`keep`] with an explicit clock reading
    pub fn keep_at(&mut self, line: &str, now: Instant) -> bool {
        let line = line.trim().to_lowercase();
        for group_idx in 0..self.groups.len() {
            if self.keep_in_group(&line, group_idx, now) {
                return true;
            }
        }
        false
    }

    fn keep_in_group(&mut self, line: &str, group_idx: usize, now: Instant) -> bool {
        let group = self.groups[group_idx].clone();
        for &keyword in &group.keywords {
            if !line.contains(keyword) {
                continue;
            }
            if group.mutually_exclusive {
                for &sibling in &group.keywords {
                    if sibling != keyword {
                        self.last_emitted.remove(sibling);
                    }
                }
            }
            match self.last_emitted.get(keyword) {
                None => {
                    self.last_emitted.insert(keyword, now);
                    return true;
                }
                Some(&last) => {
                    if now.duration_since(last) >= group.interval {
                        self.last_emitted.insert(keyword, now);
                        return true;
                    }
                    return false;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_lines_dropped() {
        let mut filter = LogFilter::spark_default();
        assert!(!filter.keep("INFO Client: some routine chatter"));
    }

    #[test]
    fn test_zero_interval_always_emits() {
        let mut filter = LogFilter::spark_default();
        let now = Instant::now();
        assert!(filter.keep_at("WARN Client: deprecated option", now));
        assert!(filter.keep_at("WARN Client: deprecated option", now));
    }

    #[test]
    fn test_state_lines_throttled() {
        let mut filter = LogFilter::spark_default();
        let now = Instant::now();
        assert!(filter.keep_at("state: RUNNING", now));
        assert!(!filter.keep_at("state: RUNNING", now + Duration::from_secs(5)));
        assert!(filter.keep_at("state: RUNNING", now + Duration::from_secs(601)));
    }

    #[test]
    fn test_state_transition_prints_immediately() {
        let mut filter = LogFilter::spark_default();
        let now = Instant::now();
        assert!(filter.keep_at("state: ACCEPTED", now));
        assert!(!filter.keep_at("state: ACCEPTED", now + Duration::from_secs(1)));
        // Transition to RUNNING is a different keyword: prints at once.
        assert!(filter.keep_at("state: RUNNING", now + Duration::from_secs(2)));
        // And the transition reset ACCEPTED.
        assert!(filter.keep_at("state: ACCEPTED", now + Duration::from_secs(3)));
    }

    #[test]
    fn test_exceptions_throttle_briefly() {
        let mut filter = LogFilter::spark_default();
        let now = Instant::now();
        assert!(filter.keep_at("java.io.IOException: boom", now));
        assert!(!filter.keep_at("java.io.IOException: boom", now + Duration::from_millis(200)));
        assert!(filter.keep_at("java.io.IOException: boom", now + Duration::from_secs(2)));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = LogFilter::spark_default();
        let now = Instant::now();
        assert!(filter.keep_at("tracking URL: http://rm/app", now));
        assert!(!filter.keep_at("tracking URL: http://rm/app", now + Duration::from_secs(60)));
        filter.reset();
        assert!(filter.keep_at("tracking URL: http://rm/app", now + Duration::from_secs(61)));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let mut filter = LogFilter::spark_default();
        assert!(filter.keep("  Queue: analytics  "));
    }
}
