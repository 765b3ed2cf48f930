use super::SimStore;
use crate::{
    catalog::{AgentTypeDef, TypeAttributeRecord, TypeCatalog},
    error::SimResult,
};
use rusqlite::params;
use std::collections::HashMap;

impl SimStore {
    // ── Type catalog ──────────────────────────────────────────────

    /// Insert one type definition with its bases and attributes.
    pub fn insert_agent_type(&self, def: &AgentTypeDef) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let load_order: i64 = tx.query_row("SELECT COUNT(*) FROM agent_type", [], |row| row.get(0))?;
        tx.execute(
            "INSERT INTO agent_type (name, agent_class, load_order) VALUES (?1, ?2, ?3)",
            params![&def.name, &def.agent_class, load_order],
        )?;
        for (position, base) in def.bases.iter().enumerate() {
            tx.execute(
                "INSERT INTO agent_type_base (agent_type, position, base) VALUES (?1, ?2, ?3)",
                params![&def.name, position as i64, base],
            )?;
        }
        for record in &def.attributes {
            tx.execute(
                "INSERT INTO agent_type_attribute (agent_type, name, value, value_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&def.name, &record.name, &record.value, &record.value_type],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_type_catalog(&self, catalog: &TypeCatalog) -> SimResult<()> {
        for def in catalog.definitions() {
            self.insert_agent_type(def)?;
        }
        Ok(())
    }

    /// Read every stored type definition, in load order.
    pub fn agent_type_defs(&self) -> SimResult<Vec<AgentTypeDef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, agent_class FROM agent_type ORDER BY load_order ASC")?;
        let mut defs = stmt
            .query_map([], |row| {
                Ok(AgentTypeDef {
                    name: row.get(0)?,
                    bases: Vec::new(),
                    agent_class: row.get(1)?,
                    attributes: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let index: HashMap<String, usize> = defs
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT agent_type, base FROM agent_type_base ORDER BY agent_type, position ASC",
        )?;
        let bases = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (agent_type, base) in bases {
            if let Some(&i) = index.get(&agent_type) {
                defs[i].bases.push(base);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT agent_type, name, value, value_type FROM agent_type_attribute
             ORDER BY agent_type, name ASC",
        )?;
        let attributes = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    TypeAttributeRecord {
                        name: row.get(1)?,
                        value: row.get(2)?,
                        value_type: row.get(3)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (agent_type, record) in attributes {
            if let Some(&i) = index.get(&agent_type) {
                defs[i].attributes.push(record);
            }
        }
        Ok(defs)
    }

    /// Build the type catalog from the stored definitions.
    pub fn load_type_catalog(&self) -> SimResult<TypeCatalog> {
        TypeCatalog::build(self.agent_type_defs()?)
    }
}
