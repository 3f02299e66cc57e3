//! Encounter summaries and the local leaderboard
//!
//! The core hands a plain summary to a `SummarySink` at encounter end. Signing,
//! rate limiting and storage are the sink's business.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::ShipType;

/// Maximum number of entries kept in the local table
pub const MAX_HIGH_SCORES: usize = 10;

/// Result of one finished encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSummary {
    pub score: u64,
    pub kills: u32,
    /// 1-based wave reached
    pub wave: u32,
    /// 1-based cycle reached
    pub cycle: u32,
    pub ship: ShipType,
    pub elapsed_secs: f32,
    /// Campaign completed
    pub victory: bool,
}

impl EncounterSummary {
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Receiver for finished encounters (leaderboard service, local table, ...)
pub trait SummarySink {
    fn submit(&mut self, summary: &EncounterSummary);
}

/// In-memory top scores, sorted descending
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalScoreTable {
    pub entries: Vec<EncounterSummary>,
}

impl LocalScoreTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the table
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a summary if it qualifies; returns the rank achieved (1-indexed)
    pub fn add(&mut self, summary: EncounterSummary) -> Option<usize> {
        if !self.qualifies(summary.score) {
            return None;
        }
        // Equal scores keep arrival order
        let pos = self.entries.iter().position(|e| summary.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, summary);
                i + 1
            }
            None => {
                self.entries.push(summary);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut table: LocalScoreTable = serde_json::from_str(json)?;
        table.entries.sort_by(|a, b| b.score.cmp(&a.score));
        table.entries.truncate(MAX_HIGH_SCORES);
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl SummarySink for LocalScoreTable {
    fn submit(&mut self, summary: &EncounterSummary) {
        match self.add(summary.clone()) {
            Some(rank) => log::info!("New high score #{rank}: {}", summary.score),
            None => log::debug!("Score {} did not place", summary.score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(score: u64) -> EncounterSummary {
        EncounterSummary {
            score,
            kills: 3,
            wave: 2,
            cycle: 1,
            ship: ShipType::Vanguard,
            elapsed_secs: 42.0,
            victory: false,
        }
    }

    #[test]
    fn test_qualifies_empty() {
        let table = LocalScoreTable::new();
        assert!(table.qualifies(100));
        assert!(!table.qualifies(0));
    }

    #[test]
    fn test_add_sorted() {
        let mut table = LocalScoreTable::new();
        assert_eq!(table.add(summary(100)), Some(1));
        assert_eq!(table.add(summary(300)), Some(1));
        assert_eq!(table.add(summary(200)), Some(2));
        let scores: Vec<_> = table.entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![300, 200, 100]);
        assert_eq!(table.top_score(), Some(300));
    }

    #[test]
    fn test_keeps_top_ten() {
        let mut table = LocalScoreTable::new();
        for i in 1..=10 {
            table.add(summary(i * 100));
        }
        assert_eq!(table.entries.len(), MAX_HIGH_SCORES);
        assert!(!table.qualifies(50));
        assert_eq!(table.potential_rank(550), Some(6));
        assert_eq!(table.add(summary(1500)), Some(1));
        assert_eq!(table.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(table.entries.last().map(|e| e.score), Some(200));
    }

    #[test]
    fn test_sink_submit_records() {
        let mut table = LocalScoreTable::new();
        table.submit(&summary(500));
        table.submit(&summary(0));
        assert_eq!(table.entries.len(), 1);
    }

    #[test]
    fn test_json_load_resorts() {
        let mut table = LocalScoreTable::new();
        table.entries = vec![summary(10), summary(30), summary(20)];
        let json = table.to_json().unwrap();
        let loaded = LocalScoreTable::from_json(&json).unwrap();
        assert_eq!(loaded.top_score(), Some(30));
        assert!(summary(5).to_json().unwrap().contains("\"ship\":\"Vanguard\""));
    }
}
