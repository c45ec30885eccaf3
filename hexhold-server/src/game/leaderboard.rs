//! Top-10 leaderboard with diff-only updates.

use std::sync::Mutex;

use crate::core::ids::EntityId;

/// Score broken into the parts the wire format carries: an integer, an
/// optional fraction and a unit tag (`'M'`, `'k'` or 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedScore {
    pub full: u32,
    pub integer: u16,
    pub fraction: u8,
    pub unit: u8,
}

/// Split a raw score into display parts: two fraction digits above a
/// million, one above a thousand, none below.
pub fn pack_score(score: u32) -> PackedScore {
    if score >= 1_000_000 {
        PackedScore {
            full: score,
            integer: (score / 1_000_000) as u16,
            fraction: ((score % 1_000_000) / 10_000) as u8,
            unit: b'M',
        }
    } else if score >= 1_000 {
        PackedScore {
            full: score,
            integer: (score / 1_000) as u16,
            fraction: ((score % 1_000) / 100) as u8,
            unit: b'k',
        }
    } else {
        PackedScore {
            full: score,
            integer: score as u16,
            fraction: 0,
            unit: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: EntityId,
    pub score: PackedScore,
}

/// Keeps the current top 10 by full score, descending. `update` returns only
/// the entries whose displayed parts changed so broadcasts stay small.
pub struct Leaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Rebuild from a `(player, score)` snapshot; returns the changed
    /// entries, or `None` when nothing visible moved.
    pub fn update(&self, players: &[(EntityId, u32)]) -> Option<Vec<LeaderboardEntry>> {
        let mut updated: Vec<LeaderboardEntry> = players
            .iter()
            .map(|&(player_id, score)| LeaderboardEntry {
                player_id,
                score: pack_score(score),
            })
            .collect();
        updated.sort_by(|a, b| b.score.full.cmp(&a.score.full));
        updated.truncate(10);

        let mut entries = self.entries.lock().unwrap();
        let changes: Vec<LeaderboardEntry> = updated
            .iter()
            .filter(|entry| {
                match entries.iter().find(|e| e.player_id == entry.player_id) {
                    Some(prev) => {
                        prev.score.integer != entry.score.integer
                            || prev.score.fraction != entry.score.fraction
                            || prev.score.unit != entry.score.unit
                    }
                    None => true,
                }
            })
            .copied()
            .collect();

        *entries = updated;
        if changes.is_empty() {
            None
        } else {
            Some(changes)
        }
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_score_tiers() {
        assert_eq!(
            pack_score(950),
            PackedScore { full: 950, integer: 950, fraction: 0, unit: 0 }
        );
        assert_eq!(
            pack_score(12_345),
            PackedScore { full: 12_345, integer: 12, fraction: 3, unit: b'k' }
        );
        assert_eq!(
            pack_score(2_340_000),
            PackedScore { full: 2_340_000, integer: 2, fraction: 34, unit: b'M' }
        );
    }

    #[test]
    fn sorted_descending_and_capped_at_ten() {
        let lb = Leaderboard::new();
        let players: Vec<(EntityId, u32)> =
            (0..12).map(|i| (EntityId(i), u32::from(i) * 100)).collect();
        lb.update(&players).unwrap();
        let entries = lb.entries();
        assert_eq!(entries.len(), 10);
        for pair in entries.windows(2) {
            assert!(pair[0].score.full >= pair[1].score.full);
        }
        assert_eq!(entries[0].player_id, EntityId(11));
    }

    #[test]
    fn diff_reports_only_visibly_changed_entries() {
        let lb = Leaderboard::new();
        lb.update(&[(EntityId(1), 100), (EntityId(2), 200), (EntityId(3), 300)])
            .unwrap();

        // Player 1 jumps to 2100: ordering becomes (1, 3, 2) but only player
        // 1's displayed score actually changed.
        let changes = lb
            .update(&[(EntityId(1), 2100), (EntityId(2), 200), (EntityId(3), 300)])
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].player_id, EntityId(1));
        assert_eq!(changes[0].score.unit, b'k');
    }

    #[test]
    fn unchanged_scores_produce_no_update() {
        let lb = Leaderboard::new();
        lb.update(&[(EntityId(1), 5000)]).unwrap();
        // 5000 -> 5050 stays "5.0k" on screen.
        assert!(lb.update(&[(EntityId(1), 5050)]).is_none());
        // 5050 -> 5150 flips the fraction digit.
        assert!(lb.update(&[(EntityId(1), 5150)]).is_some());
    }

    #[test]
    fn new_entrant_is_a_change() {
        let lb = Leaderboard::new();
        lb.update(&[(EntityId(1), 10)]).unwrap();
        let changes = lb.update(&[(EntityId(1), 10), (EntityId(2), 5)]).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].player_id, EntityId(2));
    }
}
