use serde::{Deserialize, Serialize};

/// Row counts for one published table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows: u64,
}

/// Summary of a completed generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    pub tables: Vec<TableReport>,
    pub facts_generated: u64,
    pub retries_total: u64,
    pub duration_ms: u64,
    pub rows_per_sec: f64,
}
