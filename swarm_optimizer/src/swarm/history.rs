use serde::Serialize;

/// Snapshot of the swarm after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 1-based; record `n` describes the swarm after its `n`-th update.
    pub iteration: u64,
    pub global_best_fitness: f64,
    /// Mean fitness of the particles' current positions.
    pub mean_fitness: f64,
    pub improved: bool,
}

/// Per-iteration progress of a run, filled in while the swarm iterates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    records: Vec<IterationRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_iter(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// Global-best fitness after each iteration.
    pub fn global_bests(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.global_best_fitness).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }
}
