use crate::events::LogicalKey;
use std::collections::HashMap;

/// Cumulative per-key press counters with derived 0-9 heat levels.
///
/// Levels are relative: every read scales against the current
/// most-pressed key, so earlier readings go stale as the maximum moves.
#[derive(Debug, Default)]
pub struct KeyHeatmap {
    counts: HashMap<LogicalKey, u64>,
}

impl KeyHeatmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the counters with a persisted snapshot.
    pub fn preload(&mut self, counts: HashMap<LogicalKey, u64>) {
        self.counts = counts;
    }

    pub fn record(&mut self, key: LogicalKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn count(&self, key: LogicalKey) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<LogicalKey, u64> {
        &self.counts
    }

    pub fn total_presses(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Heat bucket for one key: 0 for a never-pressed key, otherwise 1-9
    /// scaled against the current most-pressed key.
    pub fn heat_level(&self, key: LogicalKey) -> u8 {
        let count = self.count(key);
        if count == 0 {
            return 0;
        }
        scale(count, self.max_count())
    }

    /// Heat buckets for every key seen so far.
    pub fn heat_levels(&self) -> HashMap<LogicalKey, u8> {
        let max = self.max_count();
        self.counts
            .iter()
            .map(|(&key, &count)| {
                let level = if count == 0 { 0 } else { scale(count, max) };
                (key, level)
            })
            .collect()
    }

    fn max_count(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }
}

fn scale(count: u64, max: u64) -> u8 {
    ((9 * count) / max).clamp(1, 9) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpressed_key_is_cold() {
        let heatmap = KeyHeatmap::new();
        assert_eq!(heatmap.heat_level(LogicalKey::Char('a')), 0);
        assert_eq!(heatmap.count(LogicalKey::Char('a')), 0);
    }

    #[test]
    fn test_hottest_key_is_nine() {
        let mut heatmap = KeyHeatmap::new();
        heatmap.record(LogicalKey::Char('e'));
        assert_eq!(heatmap.heat_level(LogicalKey::Char('e')), 9);
    }

    #[test]
    fn test_levels_scale_against_maximum() {
        let mut heatmap = KeyHeatmap::new();
        for _ in 0..10 {
            heatmap.record(LogicalKey::Char('a'));
        }
        for _ in 0..5 {
            heatmap.record(LogicalKey::Char('s'));
        }
        heatmap.record(LogicalKey::Char('d'));

        // floor(9 * count / max), clamped into 1..=9
        assert_eq!(heatmap.heat_level(LogicalKey::Char('a')), 9);
        assert_eq!(heatmap.heat_level(LogicalKey::Char('s')), 4);
        assert_eq!(heatmap.heat_level(LogicalKey::Char('d')), 1);
        assert_eq!(heatmap.heat_level(LogicalKey::Char('f')), 0);
    }

    #[test]
    fn test_levels_shift_as_maximum_moves() {
        let mut heatmap = KeyHeatmap::new();
        for _ in 0..4 {
            heatmap.record(LogicalKey::Space);
        }
        for _ in 0..8 {
            heatmap.record(LogicalKey::Char('e'));
        }
        assert_eq!(heatmap.heat_level(LogicalKey::Space), 4);

        for _ in 0..8 {
            heatmap.record(LogicalKey::Char('e'));
        }
        // same space count, colder now that e pulled ahead
        assert_eq!(heatmap.heat_level(LogicalKey::Space), 2);
    }

    #[test]
    fn test_heat_levels_covers_all_seen_keys() {
        let mut heatmap = KeyHeatmap::new();
        heatmap.record(LogicalKey::Enter);
        heatmap.record(LogicalKey::Enter);
        heatmap.record(LogicalKey::Backspace);

        let levels = heatmap.heat_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[&LogicalKey::Enter], 9);
        assert_eq!(levels[&LogicalKey::Backspace], 4);
    }

    #[test]
    fn test_preload_and_clear() {
        let mut heatmap = KeyHeatmap::new();
        heatmap.preload(HashMap::from([
            (LogicalKey::Char('x'), 3),
            (LogicalKey::Tab, 9),
        ]));
        assert_eq!(heatmap.total_presses(), 12);
        assert_eq!(heatmap.heat_level(LogicalKey::Char('x')), 3);

        heatmap.clear();
        assert!(heatmap.is_empty());
        assert_eq!(heatmap.heat_level(LogicalKey::Tab), 0);
    }
}
