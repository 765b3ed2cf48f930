//! The agent type catalog.
//!
//! Loaded once at startup (from JSON or from the store) and read-only
//! afterwards. Building the catalog linearizes every type and flattens
//! its attribute table, so a bad hierarchy fails here, before any agent
//! is constructed.

use crate::{
    error::{SimError, SimResult},
    hierarchy,
    value::{AttrValue, ValueType},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One type-level attribute as stored: textual value plus a type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeAttributeRecord {
    pub name: String,
    pub value: String,
    pub value_type: String,
}

impl TypeAttributeRecord {
    pub fn new(name: &str, value: impl ToString, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            value_type: value_type.tag().to_string(),
        }
    }

    pub fn parse(&self) -> SimResult<AttrValue> {
        let value_type = ValueType::from_tag(&self.value_type)
            .filter(|t| *t != ValueType::Agent)
            .ok_or_else(|| SimError::TypeMismatch {
                name: self.name.clone(),
                expected: "int|float|str|bool".to_string(),
                found: self.value_type.clone(),
            })?;
        AttrValue::Str(self.value.clone()).coerce(value_type, &self.name)
    }
}

/// Raw catalog entry, as found in `agent_types.json` or the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentTypeDef {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub agent_class: Option<String>,
    #[serde(default)]
    pub attributes: Vec<TypeAttributeRecord>,
}

impl AgentTypeDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bases: Vec::new(),
            agent_class: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_bases(mut self, bases: &[&str]) -> Self {
        self.bases = bases.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_class(mut self, agent_class: &str) -> Self {
        self.agent_class = Some(agent_class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl ToString, value_type: ValueType) -> Self {
        self.attributes
            .push(TypeAttributeRecord::new(name, value, value_type));
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    agent_types: Vec<AgentTypeDef>,
}

/// A resolved agent type. Immutable; shared by every agent of the type.
#[derive(Debug)]
pub struct AgentType {
    name: String,
    bases: Vec<String>,
    agent_class: Option<String>,
    own: HashMap<String, AttrValue>,
    linearization: Vec<String>,
    /// name → (declaring type, value), first hit along the linearization.
    resolved: HashMap<String, (String, AttrValue)>,
}

impl AgentType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn agent_class(&self) -> Option<&str> {
        self.agent_class.as_deref()
    }

    /// Most-specific-first resolution order, starting with this type.
    pub fn linearization(&self) -> &[String] {
        &self.linearization
    }

    pub fn declared_here(&self, name: &str) -> bool {
        self.own.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> SimResult<&AttrValue> {
        self.resolved
            .get(name)
            .map(|(_, value)| value)
            .ok_or_else(|| SimError::UnknownAttribute {
                name: name.to_string(),
            })
    }

    /// The type that supplied the resolved value of `name`.
    pub fn resolved_from(&self, name: &str) -> Option<&str> {
        self.resolved.get(name).map(|(owner, _)| owner.as_str())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.resolved.keys().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: BTreeMap<String, Arc<AgentType>>,
    defs: Vec<AgentTypeDef>,
}

impl TypeCatalog {
    /// Validate and resolve a set of type definitions.
    pub fn build(defs: Vec<AgentTypeDef>) -> SimResult<Self> {
        let mut bases: HashMap<String, Vec<String>> = HashMap::new();
        let mut own: HashMap<String, HashMap<String, AttrValue>> = HashMap::new();
        for def in &defs {
            if bases.insert(def.name.clone(), def.bases.clone()).is_some() {
                return Err(SimError::InconsistentHierarchy {
                    agent_type: def.name.clone(),
                    detail: "type defined more than once".to_string(),
                });
            }
            let mut attrs = HashMap::new();
            for record in &def.attributes {
                attrs.insert(record.name.clone(), record.parse()?);
            }
            own.insert(def.name.clone(), attrs);
        }

        let mut orders = hierarchy::linearize_all(&bases)?;

        let mut types = BTreeMap::new();
        for def in &defs {
            let linearization = orders.remove(&def.name).unwrap_or_default();
            let mut resolved: HashMap<String, (String, AttrValue)> = HashMap::new();
            for ancestor in &linearization {
                let Some(attrs) = own.get(ancestor) else { continue };
                for (name, value) in attrs {
                    resolved
                        .entry(name.clone())
                        .or_insert_with(|| (ancestor.clone(), value.clone()));
                }
            }
            let agent_type = AgentType {
                name: def.name.clone(),
                bases: def.bases.clone(),
                agent_class: def.agent_class.clone(),
                own: own.get(&def.name).cloned().unwrap_or_default(),
                linearization,
                resolved,
            };
            types.insert(def.name.clone(), Arc::new(agent_type));
        }

        log::info!("Type catalog loaded: {} agent types", types.len());
        Ok(Self { types, defs })
    }

    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::build(file.agent_types)
    }

    /// Read `agent_types.json` from `path`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json_str(&content)?)
    }

    /// The catalog shipped in `data/agent_types.json`.
    pub fn bundled() -> SimResult<Self> {
        Self::from_json_str(include_str!("../../data/agent_types.json"))
    }

    pub fn get(&self, name: &str) -> SimResult<Arc<AgentType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| SimError::UnknownAgentType {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The raw definitions the catalog was built from, in load order.
    pub fn definitions(&self) -> &[AgentTypeDef] {
        &self.defs
    }

    /// Sum a numeric type attribute over `quantity` units of a type.
    /// Types that do not resolve the attribute contribute zero.
    pub fn total_attribute(&self, type_name: &str, attribute: &str, quantity: u32) -> SimResult<f64> {
        let agent_type = self.get(type_name)?;
        let per_unit = agent_type
            .resolve(attribute)
            .ok()
            .and_then(AttrValue::as_f64)
            .unwrap_or(0.0);
        Ok(per_unit * f64::from(quantity))
    }

    /// Sum a numeric type attribute over a list of type names, one unit
    /// each. Repeated names count once per occurrence.
    pub fn sum_attribute(&self, type_names: &[&str], attribute: &str) -> SimResult<f64> {
        type_names
            .iter()
            .map(|name| self.total_attribute(name, attribute, 1))
            .sum()
    }

    /// Sum a numeric type attribute over every type in `agent_class`.
    pub fn class_total(&self, agent_class: &str, attribute: &str) -> f64 {
        self.types
            .values()
            .filter(|t| t.agent_class() == Some(agent_class))
            .filter_map(|t| t.resolve(attribute).ok().and_then(AttrValue::as_f64))
            .sum()
    }
}
