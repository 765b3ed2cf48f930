//! Type-level attribute resolution through the catalog.

use habitat_core::{
    agent::AgentCore,
    catalog::{AgentTypeDef, TypeCatalog},
    error::SimError,
    model::Model,
    value::{AttrValue, ValueType},
};
use std::sync::Arc;

fn diamond() -> TypeCatalog {
    TypeCatalog::build(vec![
        AgentTypeDef::new("root")
            .with_attr("m", 1, ValueType::Int)
            .with_attr("n", "root", ValueType::Str),
        AgentTypeDef::new("parent_one")
            .with_bases(&["root"])
            .with_attr("m", 2, ValueType::Int),
        AgentTypeDef::new("parent_two")
            .with_bases(&["root"])
            .with_attr("m", 3, ValueType::Int)
            .with_attr("o", 30, ValueType::Int),
        AgentTypeDef::new("child_one")
            .with_bases(&["parent_one", "parent_two"])
            .with_attr("p", true, ValueType::Bool),
        AgentTypeDef::new("child_two")
            .with_bases(&["parent_two", "parent_one"])
            .with_attr("m", 4, ValueType::Int),
    ])
    .expect("diamond catalog")
}

#[test]
fn first_listed_base_wins() {
    let catalog = diamond();
    let child_one = catalog.get("child_one").unwrap();
    assert_eq!(child_one.resolve("m").unwrap(), &AttrValue::Int(2));
    assert_eq!(child_one.resolved_from("m"), Some("parent_one"));
    assert_eq!(
        child_one.linearization(),
        &["child_one", "parent_one", "parent_two", "root"]
    );

    let child_two = catalog.get("child_two").unwrap();
    assert_eq!(
        child_two.linearization(),
        &["child_two", "parent_two", "parent_one", "root"]
    );
}

/// Same diamond, but neither child declares `m` itself.
fn plain_diamond() -> TypeCatalog {
    TypeCatalog::build(vec![
        AgentTypeDef::new("root").with_attr("m", 1, ValueType::Int),
        AgentTypeDef::new("parent_one")
            .with_bases(&["root"])
            .with_attr("m", 2, ValueType::Int),
        AgentTypeDef::new("parent_two")
            .with_bases(&["root"])
            .with_attr("m", 3, ValueType::Int),
        AgentTypeDef::new("child_one").with_bases(&["parent_one", "parent_two"]),
        AgentTypeDef::new("child_two").with_bases(&["parent_two", "parent_one"]),
    ])
    .expect("plain diamond catalog")
}

#[test]
fn base_order_decides_an_inherited_attribute() {
    let catalog = plain_diamond();
    let child_one = catalog.get("child_one").unwrap();
    assert_eq!(child_one.resolve("m").unwrap(), &AttrValue::Int(2));
    assert_eq!(child_one.resolved_from("m"), Some("parent_one"));
    assert!(!child_one.declared_here("m"));

    let child_two = catalog.get("child_two").unwrap();
    assert_eq!(child_two.resolve("m").unwrap(), &AttrValue::Int(3));
    assert_eq!(child_two.resolved_from("m"), Some("parent_two"));
    assert!(!child_two.declared_here("m"));

    let model = Model::with_seed(1, 1, 1, Arc::new(plain_diamond()));
    let one = AgentCore::new(&model, "child_one", 1).unwrap();
    let two = AgentCore::new(&model, "child_two", 2).unwrap();
    assert_eq!(one.get_agent_type_attribute("m").unwrap(), &AttrValue::Int(2));
    assert_eq!(two.get_agent_type_attribute("m").unwrap(), &AttrValue::Int(3));
}

#[test]
fn single_declaration_is_found_from_either_side() {
    let catalog = diamond();
    for name in ["child_one", "child_two"] {
        let agent_type = catalog.get(name).unwrap();
        assert_eq!(agent_type.resolve("o").unwrap(), &AttrValue::Int(30));
        assert_eq!(agent_type.resolve("n").unwrap(), &AttrValue::Str("root".to_string()));
    }
}

#[test]
fn own_declaration_always_wins() {
    let catalog = diamond();
    let child_two = catalog.get("child_two").unwrap();
    assert_eq!(child_two.resolve("m").unwrap(), &AttrValue::Int(4));
    assert!(child_two.declared_here("m"));
    assert!(!child_two.declared_here("o"));

    let child_one = catalog.get("child_one").unwrap();
    assert_eq!(child_one.resolve("p").unwrap(), &AttrValue::Bool(true));
}

#[test]
fn unresolved_attribute_is_an_error() {
    let catalog = diamond();
    let root = catalog.get("root").unwrap();
    assert!(matches!(
        root.resolve("o"),
        Err(SimError::UnknownAttribute { name }) if name == "o"
    ));
}

#[test]
fn inconsistent_hierarchy_fails_at_build() {
    let result = TypeCatalog::build(vec![
        AgentTypeDef::new("root"),
        AgentTypeDef::new("x").with_bases(&["root"]),
        AgentTypeDef::new("y").with_bases(&["root"]),
        AgentTypeDef::new("xy").with_bases(&["x", "y"]),
        AgentTypeDef::new("yx").with_bases(&["y", "x"]),
        AgentTypeDef::new("bad").with_bases(&["xy", "yx"]),
    ]);
    assert!(matches!(
        result,
        Err(SimError::InconsistentHierarchy { agent_type, .. }) if agent_type == "bad"
    ));
}

#[test]
fn base_listed_before_its_own_subtype_is_rejected() {
    let result = TypeCatalog::build(vec![
        AgentTypeDef::new("root"),
        AgentTypeDef::new("leaf").with_bases(&["root"]),
        AgentTypeDef::new("odd").with_bases(&["root", "leaf"]),
    ]);
    assert!(matches!(result, Err(SimError::InconsistentHierarchy { .. })));
}

#[test]
fn catalog_rejects_bad_definitions() {
    let missing = TypeCatalog::build(vec![AgentTypeDef::new("a").with_bases(&["ghost"])]);
    assert!(matches!(missing, Err(SimError::UnknownAgentType { .. })));

    let twice = TypeCatalog::build(vec![AgentTypeDef::new("a"), AgentTypeDef::new("a")]);
    assert!(matches!(twice, Err(SimError::InconsistentHierarchy { .. })));

    let bad_value = TypeCatalog::build(vec![AgentTypeDef::new("a").with_attr("x", "many", ValueType::Int)]);
    assert!(matches!(bad_value, Err(SimError::TypeMismatch { .. })));

    assert!(matches!(diamond().get("nope"), Err(SimError::UnknownAgentType { .. })));
}

#[test]
fn bundled_catalog_resolves_through_bases() {
    let catalog = TypeCatalog::bundled().unwrap();
    let human = catalog.get("human").unwrap();
    assert_eq!(human.linearization(), &["human", "enclosed_agent", "base_agent"]);
    assert_eq!(human.resolve("char_mass").unwrap(), &AttrValue::Float(0.0));
    assert_eq!(human.resolved_from("char_mass"), Some("base_agent"));

    let plumbing = catalog.get("plumbing_system").unwrap();
    assert_eq!(plumbing.resolve("char_mass").unwrap(), &AttrValue::Float(120.0));
    assert_eq!(plumbing.agent_class(), Some("eclss"));
}

#[test]
fn aggregate_queries_over_types() {
    let catalog = TypeCatalog::bundled().unwrap();
    assert_eq!(
        catalog.sum_attribute(&["structure", "plumbing_system"], "char_mass").unwrap(),
        4_120.0
    );
    assert_eq!(catalog.total_attribute("structure", "char_mass", 2).unwrap(), 8_000.0);
    assert_eq!(catalog.total_attribute("human", "recycle_rate_per_day", 3).unwrap(), 0.0);
    assert_eq!(catalog.class_total("eclss", "char_mass"), 120.0);
    assert!(catalog.sum_attribute(&["structure", "ghost"], "char_mass").is_err());
}

#[test]
fn catalog_loads_from_json() {
    let json = r#"{"agent_types": [
        {"name": "base", "attributes": [{"name": "k", "value": "2.5", "value_type": "float"}]},
        {"name": "leaf", "bases": ["base"], "agent_class": "thing"}
    ]}"#;
    let catalog = TypeCatalog::from_json_str(json).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("leaf").unwrap().resolve("k").unwrap(), &AttrValue::Float(2.5));
}
