//! Agents: identity, attributes, and per-tick behaviour.
//!
//! RULE: An agent never owns another agent. Cross-agent links are
//! attributes holding an `AgentId`; the Model resolves them on demand.
//! A reference to a destroyed agent simply resolves to nothing.

use crate::{
    attribute::{AttributeHolder, AttributeSpec},
    catalog::AgentType,
    error::{SimError, SimResult},
    model::Model,
    types::AgentId,
    value::AttrValue,
};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by every agent kind: id, type, and attribute directory.
#[derive(Debug, Clone)]
pub struct AgentCore {
    id:         AgentId,
    agent_type: Arc<AgentType>,
    attributes: AttributeHolder,
}

impl AgentCore {
    /// Bind a new agent to `type_name` from the model's catalog.
    pub fn new(model: &Model, type_name: &str, id: AgentId) -> SimResult<Self> {
        Ok(Self {
            id,
            agent_type: model.catalog().get(type_name)?,
            attributes: AttributeHolder::new(),
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn agent_type(&self) -> &Arc<AgentType> {
        &self.agent_type
    }

    pub fn type_name(&self) -> &str {
        self.agent_type.name()
    }

    pub fn attributes(&self) -> &AttributeHolder {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeHolder {
        &mut self.attributes
    }

    /// Declare an instance attribute. Unless it is marked instance-only, a
    /// type-level attribute of the same name replaces the given default.
    pub fn declare(&mut self, spec: AttributeSpec) -> SimResult<()> {
        let spec = match self.agent_type.resolve(spec.name()) {
            Ok(type_value) if !spec.is_instance_only() => spec.with_type_default(type_value.clone()),
            _ => spec,
        };
        self.attributes.declare(spec)
    }

    pub fn get(&self, name: &str) -> SimResult<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> SimResult<()> {
        self.attributes.set(name, value)
    }

    pub fn get_f64(&self, name: &str) -> SimResult<f64> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| mismatch(name, "float", value))
    }

    /// Store a float, coerced to the declared type.
    pub fn set_f64(&mut self, name: &str, value: f64) -> SimResult<()> {
        self.set(name, value)
    }

    pub fn get_i64(&self, name: &str) -> SimResult<i64> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| mismatch(name, "int", value))
    }

    pub fn get_agent_ref(&self, name: &str) -> SimResult<Option<AgentId>> {
        match self.get(name)? {
            AttrValue::Agent(id) => Ok(*id),
            other => Err(mismatch(name, "agent", other)),
        }
    }

    pub fn set_agent_ref(&mut self, name: &str, target: Option<AgentId>) -> SimResult<()> {
        self.set(name, AttrValue::Agent(target))
    }

    /// Type-level lookup along this agent's linearized type hierarchy.
    pub fn get_agent_type_attribute(&self, name: &str) -> SimResult<&AttrValue> {
        self.agent_type.resolve(name)
    }

    pub fn type_f64(&self, name: &str) -> SimResult<f64> {
        let value = self.get_agent_type_attribute(name)?;
        value.as_f64().ok_or_else(|| mismatch(name, "float", value))
    }

    /// Memoise a value derived from this agent's type attributes.
    pub fn cached<F>(&mut self, key: &str, compute: F) -> SimResult<AttrValue>
    where
        F: FnOnce(&AgentType) -> SimResult<AttrValue>,
    {
        let agent_type = &self.agent_type;
        self.attributes.cached(key, || compute(agent_type.as_ref()))
    }
}

fn mismatch(name: &str, expected: &str, found: &AttrValue) -> SimError {
    SimError::TypeMismatch {
        name:     name.to_string(),
        expected: expected.to_string(),
        found:    found.value_type().to_string(),
    }
}

/// The contract every agent kind must fulfill.
pub trait Agent: Send {
    fn core(&self) -> &AgentCore;

    fn core_mut(&mut self) -> &mut AgentCore;

    /// Called once per tick by the model, in registration order.
    ///
    /// While this runs the agent is detached from the registry, so it may
    /// freely borrow peers mutably through `model`. To destroy itself the
    /// agent calls `model.remove_agent(self.id())`.
    fn step(&mut self, model: &mut Model) -> SimResult<()>;

    /// For downcasting in tests and between cooperating agent kinds.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn id(&self) -> AgentId {
        self.core().id()
    }

    fn type_name(&self) -> &str {
        self.core().type_name()
    }

    fn get_agent_type_attribute(&self, name: &str) -> SimResult<&AttrValue> {
        self.core().get_agent_type_attribute(name)
    }
}

/// Builds an agent of one concrete kind with a given id.
///
/// Constructors declare attributes and may draw from the model RNG, but
/// must not register agents themselves.
pub type AgentConstructor = fn(&mut Model, AgentId) -> SimResult<Box<dyn Agent>>;

/// The construction mapping: agent type name → constructor. The set of
/// agent kinds is closed by the application that fills this in.
#[derive(Clone, Default)]
pub struct AgentFactory {
    constructors: HashMap<String, AgentConstructor>,
}

impl AgentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: &str, constructor: AgentConstructor) -> &mut Self {
        self.constructors.insert(type_name.to_string(), constructor);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn construct(&self, type_name: &str, model: &mut Model, id: AgentId) -> SimResult<Box<dyn Agent>> {
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| SimError::UnknownAgentType {
                name: type_name.to_string(),
            })?;
        constructor(model, id)
    }

    /// Construct with a fresh id and register with the model.
    pub fn spawn(&self, type_name: &str, model: &mut Model) -> SimResult<AgentId> {
        let id = model.next_agent_id();
        let agent = self.construct(type_name, model, id)?;
        model.add_agent(agent)
    }
}

/// Client-facing view of an agent: every client-visible attribute, with
/// agent references flattened to ids.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentState {
    pub agent_type: String,
    pub unique_id:  AgentId,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl AgentState {
    pub fn of(agent: &dyn Agent) -> Self {
        let core = agent.core();
        let attributes = core
            .attributes()
            .declarations()
            .filter(|decl| decl.client_visible)
            .filter_map(|decl| {
                core.get(&decl.name)
                    .ok()
                    .map(|value| (decl.name.clone(), value.to_json()))
            })
            .collect();
        Self {
            agent_type: core.type_name().to_string(),
            unique_id:  core.id(),
            attributes,
        }
    }
}
