//! Counters describing what one file's mapping changed.

use serde::Serialize;

/// Result of comparing an incoming row with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapSummary {
    pub floats_created: usize,
    pub floats_updated: usize,
    pub floats_unchanged: usize,
    pub cycles_created: usize,
    pub cycles_updated: usize,
    pub cycles_unchanged: usize,
    pub levels_written: usize,
    pub trajectory_points_inserted: usize,
    pub trajectory_points_existing: usize,
    pub trajectory_cycles_written: usize,
    pub trajectory_measurements_written: usize,
    pub history_written: usize,
}

impl MapSummary {
    pub(crate) fn record_float(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.floats_created += 1,
            UpsertOutcome::Updated => self.floats_updated += 1,
            UpsertOutcome::Unchanged => self.floats_unchanged += 1,
        }
    }

    pub(crate) fn record_cycle(&mut self, outcome: UpsertOutcome, levels_written: usize) {
        match outcome {
            UpsertOutcome::Created => self.cycles_created += 1,
            UpsertOutcome::Updated => self.cycles_updated += 1,
            UpsertOutcome::Unchanged => self.cycles_unchanged += 1,
        }
        self.levels_written += levels_written;
    }

    /// True when the file changed at least one row.
    pub fn changed_rows(&self) -> bool {
        self.floats_created
            + self.floats_updated
            + self.cycles_created
            + self.cycles_updated
            + self.levels_written
            + self.trajectory_points_inserted
            + self.trajectory_cycles_written
            + self.trajectory_measurements_written
            + self.history_written
            > 0
    }

    pub fn merge(&mut self, other: &MapSummary) {
        self.floats_created += other.floats_created;
        self.floats_updated += other.floats_updated;
        self.floats_unchanged += other.floats_unchanged;
        self.cycles_created += other.cycles_created;
        self.cycles_updated += other.cycles_updated;
        self.cycles_unchanged += other.cycles_unchanged;
        self.levels_written += other.levels_written;
        self.trajectory_points_inserted += other.trajectory_points_inserted;
        self.trajectory_points_existing += other.trajectory_points_existing;
        self.trajectory_cycles_written += other.trajectory_cycles_written;
        self.trajectory_measurements_written += other.trajectory_measurements_written;
        self.history_written += other.history_written;
    }
}
