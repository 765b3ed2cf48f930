//! Typed, per-instance attribute declarations.
//!
//! Every agent carries an `AttributeHolder`: a directory of declarations
//! (name → facets) plus the live value of each. The directory is what the
//! snapshot engine walks to decide what to persist, so attributes must be
//! declared before they are read or written.

use crate::{
    error::{SimError, SimResult},
    value::{AttrValue, ValueType},
};
use std::collections::{HashMap, HashSet};

/// Builder for a declaration. The value type is inferred from the default
/// unless set explicitly.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub(crate) name: String,
    pub(crate) default: AttrValue,
    pub(crate) value_type: Option<ValueType>,
    pub(crate) client_visible: bool,
    pub(crate) persisted: bool,
    pub(crate) instance_only: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, default: impl Into<AttrValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            value_type: None,
            client_visible: false,
            persisted: false,
            instance_only: false,
        }
    }

    /// An agent reference, empty by default.
    pub fn agent_ref(name: impl Into<String>) -> Self {
        Self::new(name, AttrValue::Agent(None))
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn client_visible(mut self) -> Self {
        self.client_visible = true;
        self
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }

    pub fn instance_only(mut self) -> Self {
        self.instance_only = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_instance_only(&self) -> bool {
        self.instance_only
    }

    /// Replace the default while pinning the value type the caller asked for.
    pub(crate) fn with_type_default(mut self, default: AttrValue) -> Self {
        let declared = self.value_type.unwrap_or_else(|| self.default.value_type());
        self.value_type = Some(declared);
        self.default = default;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDeclaration {
    pub name: String,
    pub default: AttrValue,
    pub value_type: ValueType,
    pub client_visible: bool,
    pub persisted: bool,
    pub instance_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeHolder {
    /// Declaration order; snapshots and client state follow it.
    order: Vec<String>,
    declarations: HashMap<String, AttributeDeclaration>,
    values: HashMap<String, AttrValue>,
    mutated: HashSet<String>,
    cache: HashMap<String, AttrValue>,
}

impl AttributeHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute. Redeclaring keeps the first declaration's
    /// facets and type; the live value follows the new default only while
    /// it has never been set.
    pub fn declare(&mut self, spec: AttributeSpec) -> SimResult<()> {
        if let Some(existing) = self.declarations.get(&spec.name) {
            let value_type = existing.value_type;
            if !self.mutated.contains(&spec.name) {
                let value = spec.default.coerce(value_type, &spec.name)?;
                self.values.insert(spec.name, value);
            }
            return Ok(());
        }

        let value_type = spec.value_type.unwrap_or_else(|| spec.default.value_type());
        let default = spec.default.coerce(value_type, &spec.name)?;
        self.order.push(spec.name.clone());
        self.values.insert(spec.name.clone(), default.clone());
        self.declarations.insert(
            spec.name.clone(),
            AttributeDeclaration {
                name: spec.name,
                default,
                value_type,
                client_visible: spec.client_visible,
                persisted: spec.persisted,
                instance_only: spec.instance_only,
            },
        );
        Ok(())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    pub fn declaration(&self, name: &str) -> Option<&AttributeDeclaration> {
        self.declarations.get(name)
    }

    /// All declarations in declaration order.
    pub fn declarations(&self) -> impl Iterator<Item = &AttributeDeclaration> + '_ {
        self.order.iter().filter_map(|name| self.declarations.get(name))
    }

    pub fn get(&self, name: &str) -> SimResult<&AttrValue> {
        self.values.get(name).ok_or_else(|| SimError::UnknownAttribute {
            name: name.to_string(),
        })
    }

    /// Write a value, coercing it to the declared type.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> SimResult<()> {
        let decl = self
            .declarations
            .get(name)
            .ok_or_else(|| SimError::UnknownAttribute {
                name: name.to_string(),
            })?;
        let value = value.into().coerce(decl.value_type, name)?;
        self.values.insert(name.to_string(), value);
        self.mutated.insert(name.to_string());
        Ok(())
    }

    pub fn reset_to_default(&mut self, name: &str) -> SimResult<()> {
        let decl = self
            .declarations
            .get(name)
            .ok_or_else(|| SimError::UnknownAttribute {
                name: name.to_string(),
            })?;
        self.values.insert(name.to_string(), decl.default.clone());
        self.mutated.remove(name);
        Ok(())
    }

    /// Memoise a derived value under `key`. Cached entries are not part of
    /// the declaration directory and are never persisted.
    pub fn cached<F>(&mut self, key: &str, compute: F) -> SimResult<AttrValue>
    where
        F: FnOnce() -> SimResult<AttrValue>,
    {
        if let Some(value) = self.cache.get(key) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.cache.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}
