use super::SimStore;
use crate::{error::SimResult, snapshot::Snapshot, types::Tick};
use rusqlite::{params, OptionalExtension};

impl SimStore {
    // ── Snapshot ───────────────────────────────────────────────

    /// Persist a snapshot under its own id. A single insert: either the
    /// whole snapshot is stored or nothing is.
    pub fn save_snapshot(&self, run_id: &str, snapshot: &Snapshot) -> SimResult<()> {
        let json = snapshot.to_json()?;
        self.conn.execute(
            "INSERT INTO snapshot (snapshot_id, run_id, tick, agent_count, state_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &snapshot.snapshot_id,
                run_id,
                snapshot.tick as i64,
                snapshot.agents.len() as i64,
                json
            ],
        )?;
        Ok(())
    }

    pub fn load_snapshot(&self, snapshot_id: &str) -> SimResult<Option<Snapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM snapshot WHERE snapshot_id = ?1",
                params![snapshot_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| Snapshot::from_json(&j)).transpose()
    }

    /// The most recent snapshot of a run, by tick then insertion order.
    pub fn latest_snapshot(&self, run_id: &str) -> SimResult<Option<Snapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM snapshot WHERE run_id = ?1
                 ORDER BY tick DESC, rowid DESC LIMIT 1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| Snapshot::from_json(&j)).transpose()
    }

    /// (snapshot_id, tick) for every snapshot of a run, oldest first.
    pub fn snapshot_ids(&self, run_id: &str) -> SimResult<Vec<(String, Tick)>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_id, tick FROM snapshot WHERE run_id = ?1
             ORDER BY tick ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
