use presentation_rules::{
    ClassDefinition, CompositePart, InMemoryInstanceStore, InMemorySchemaStore, InstanceKey, InstanceLabelOverride,
    LabelOverride, LabelValueSpec, Point3d, PresentationEngine, RuleSet, SimpleExpressionEvaluator, Value,
};
use std::sync::Arc;

fn stores() -> (Arc<InMemorySchemaStore>, Arc<InMemoryInstanceStore>) {
    let schema = Arc::new(InMemorySchemaStore::new());
    schema
        .insert_class(
            ClassDefinition::new("Test:A")
                .with_label("Class A")
                .with_property("Property")
                .with_property("P1")
                .with_property("P2")
                .with_property("Point"),
        )
        .unwrap();
    schema
        .insert_class(ClassDefinition::new("Test:B").with_label("Class B").with_base("Test:A"))
        .unwrap();
    let instances = Arc::new(InMemoryInstanceStore::new(schema.clone()));
    (schema, instances)
}

fn engine(schema: &Arc<InMemorySchemaStore>, instances: &Arc<InMemoryInstanceStore>, rules: RuleSet) -> PresentationEngine {
    PresentationEngine::new(
        schema.clone(),
        instances.clone(),
        Arc::new(SimpleExpressionEvaluator::new()),
        rules,
    )
    .unwrap()
}

#[test]
fn label_override_reads_property_value() {
    let (schema, instances) = stores();
    let key = InstanceKey::new("Test:A", 1);
    instances
        .insert(key.clone(), [("Property", Value::from("Custom label"))])
        .unwrap();

    let rules = RuleSet::new("labels").with_rule(LabelOverride::new("this.Property"));
    let engine = engine(&schema, &instances, rules);
    assert_eq!(engine.display_label(&key).unwrap().display_value, "Custom label");
}

#[test]
fn merged_labels_of_differing_records_are_multiple_instances() {
    let (schema, instances) = stores();
    let first = InstanceKey::new("Test:A", 1);
    let second = InstanceKey::new("Test:A", 2);
    instances
        .insert(first.clone(), [("Property", Value::from("Custom label 1"))])
        .unwrap();
    instances
        .insert(second.clone(), [("Property", Value::from("Custom label 2"))])
        .unwrap();

    let rules = RuleSet::new("labels").with_rule(LabelOverride::new("this.Property"));
    let engine = engine(&schema, &instances, rules);

    let merged = engine.merged_display_label(&[first.clone(), second.clone()]).unwrap();
    assert_eq!(merged.display_value, "Multiple instances");

    let same = engine.merged_display_label(&[first.clone(), first]).unwrap();
    assert_eq!(same.display_value, "Custom label 1");

    assert_eq!(engine.merged_display_label(&[]).unwrap().display_value, "Not specified");
}

#[test]
fn point_property_renders_with_two_decimals() {
    let (schema, instances) = stores();
    let key = InstanceKey::new("Test:A", 1);
    instances
        .insert(
            key.clone(),
            [("Point", Value::Point3d(Point3d { x: 1.0, y: 2.0, z: 3.0 }))],
        )
        .unwrap();

    let rules = RuleSet::new("labels")
        .with_rule(InstanceLabelOverride::new("Test:A", vec![LabelValueSpec::property("Point")]));
    let engine = engine(&schema, &instances, rules);
    assert_eq!(engine.display_label(&key).unwrap().display_value, "X: 1.00; Y: 2.00; Z: 3.00");
}

#[test]
fn value_specs_fall_back_in_declaration_order() {
    let (schema, instances) = stores();
    let key = InstanceKey::new("Test:A", 1);
    instances.insert(key.clone(), [("P2", Value::from("two"))]).unwrap();

    let rules = RuleSet::new("labels").with_rule(InstanceLabelOverride::new(
        "Test:A",
        vec![LabelValueSpec::property("P1"), LabelValueSpec::property("P2")],
    ));
    let engine = engine(&schema, &instances, rules);
    assert_eq!(engine.display_label(&key).unwrap().display_value, "two");

    instances.set_property(&key, "P1", Value::from("one")).unwrap();
    assert_eq!(engine.display_label(&key).unwrap().display_value, "one");
}

#[test]
fn base_class_rules_apply_to_subclasses_only() {
    let (schema, instances) = stores();
    let base = InstanceKey::new("Test:A", 1);
    let derived = InstanceKey::new("Test:B", 2);
    instances.insert(base.clone(), [("P1", Value::from("a"))]).unwrap();
    instances.insert(derived.clone(), [("P1", Value::from("b"))]).unwrap();

    let on_base = RuleSet::new("base")
        .with_rule(InstanceLabelOverride::new("Test:A", vec![LabelValueSpec::literal("from A")]));
    let engine_base = engine(&schema, &instances, on_base);
    assert_eq!(engine_base.display_label(&derived).unwrap().display_value, "from A");

    let on_derived = RuleSet::new("derived")
        .with_rule(InstanceLabelOverride::new("Test:B", vec![LabelValueSpec::literal("from B")]));
    let engine_derived = engine(&schema, &instances, on_derived);
    assert_eq!(engine_derived.display_label(&derived).unwrap().display_value, "from B");
    assert_eq!(engine_derived.display_label(&base).unwrap().display_value, "Class A [0-1]");
}

#[test]
fn composite_label_joins_parts() {
    let (schema, instances) = stores();
    let key = InstanceKey::new("Test:A", 1);
    instances
        .insert(key.clone(), [("P1", Value::from("left")), ("P2", Value::from("right"))])
        .unwrap();

    let rules = RuleSet::new("labels").with_rule(InstanceLabelOverride::new(
        "Test:A",
        vec![LabelValueSpec::composite(
            vec![
                CompositePart::required(LabelValueSpec::property("P1")),
                CompositePart::optional(LabelValueSpec::property("Property")),
                CompositePart::required(LabelValueSpec::property("P2")),
            ],
            " - ",
        )],
    ));
    let engine = engine(&schema, &instances, rules);
    assert_eq!(engine.display_label(&key).unwrap().display_value, "left - right");
}

#[test]
fn parallel_labels_match_sequential_labels() {
    let (schema, instances) = stores();
    let keys: Vec<_> = (1..=32).map(|id| InstanceKey::new("Test:A", id)).collect();
    for key in &keys {
        instances
            .insert(key.clone(), [("P1", Value::from(format!("record {}", key.id.raw())))])
            .unwrap();
    }
    let rules = RuleSet::new("labels")
        .with_rule(InstanceLabelOverride::new("Test:A", vec![LabelValueSpec::property("P1")]));
    let engine = engine(&schema, &instances, rules);

    let parallel = engine.display_labels(&keys).unwrap();
    assert_eq!(parallel.len(), keys.len());
    for (key, label) in keys.iter().zip(&parallel) {
        assert_eq!(label, &engine.display_label(key).unwrap());
    }
}

#[test]
fn unknown_record_fails_as_query_error() {
    let (schema, instances) = stores();
    let rules = RuleSet::new("labels")
        .with_rule(InstanceLabelOverride::new("Test:A", vec![LabelValueSpec::property("P1")]));
    let engine = engine(&schema, &instances, rules);
    let err = engine.display_label(&InstanceKey::new("Test:A", 99)).unwrap_err();
    assert!(err.is_collaborator_failure());
}
