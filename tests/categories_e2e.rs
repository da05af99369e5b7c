use presentation_rules::{
    CategoryIdentifier, ClassDefinition, ContentDescriptor, ContentModifier, DescriptorRequest, InMemoryInstanceStore,
    InMemorySchemaStore, PresentationEngine, PropertyCategorySpecification, PropertyInfo, PropertySpecification,
    RelatedPropertiesSpecification, RelationshipMeaning, RelationshipStep, RuleSet, SchemaCategory, SelectionSpec,
    SimpleExpressionEvaluator,
};
use std::sync::Arc;

fn engine(rules: RuleSet) -> PresentationEngine {
    let schema = Arc::new(InMemorySchemaStore::new());
    schema
        .insert_category(SchemaCategory::new("dimensions", "Dimensions", 10))
        .unwrap();
    schema
        .insert_class(
            ClassDefinition::new("Test:A")
                .with_label("Class A")
                .with_property("Name")
                .with_property("Prop")
                .with_property_info(PropertyInfo::new("Test:A", "Width").with_category("dimensions")),
        )
        .unwrap();
    schema
        .insert_class(ClassDefinition::new("Test:B").with_label("Class B").with_property("Code"))
        .unwrap();
    schema
        .insert_class(ClassDefinition::new("Test:C").with_label("Class C").with_property("Prop"))
        .unwrap();
    schema
        .insert_class(ClassDefinition::relationship("Test:AHasB", "Test:A", "Test:B").with_property("Weight"))
        .unwrap();
    let instances = Arc::new(InMemoryInstanceStore::new(schema.clone()));
    PresentationEngine::new(schema, instances, Arc::new(SimpleExpressionEvaluator::new()), rules).unwrap()
}

fn describe(engine: &PresentationEngine, spec: SelectionSpec) -> Arc<ContentDescriptor> {
    engine.descriptor(&DescriptorRequest::new(vec![spec])).unwrap()
}

fn chain<'a>(descriptor: &'a ContentDescriptor, field: &str) -> Vec<&'a str> {
    let field = descriptor.field_by_name(field).unwrap();
    descriptor.categories().chain_labels(field.category)
}

#[test]
fn default_parent_resolves_like_no_category() {
    let engine = engine(RuleSet::new("categories"));
    let related = |category: Option<CategoryIdentifier>| {
        let mut code = PropertySpecification::new("Code");
        if let Some(category) = category {
            code = code.with_category(category);
        }
        RelatedPropertiesSpecification::new(RelationshipStep::forward("Test:AHasB"))
            .with_properties(vec![code])
            .with_meaning(RelationshipMeaning::SameInstance)
    };

    let plain = describe(&engine, SelectionSpec::for_class("Test:A").with_related_properties(related(None)));
    let explicit = describe(
        &engine,
        SelectionSpec::for_class("Test:A")
            .with_property_override(PropertySpecification::new("Name").with_category(CategoryIdentifier::DefaultParent))
            .with_property_override(
                PropertySpecification::new("Width").with_category(CategoryIdentifier::DefaultParent),
            )
            .with_related_properties(related(Some(CategoryIdentifier::DefaultParent))),
    );

    assert_eq!(*plain, *explicit);
    assert_eq!(chain(&explicit, "Width"), vec!["Dimensions", "Selected Item(s)"]);
    assert_eq!(chain(&explicit, "Code"), vec!["Class B", "Selected Item(s)"]);
}

#[test]
fn shared_category_id_merges_categories_and_fields() {
    let shared = |class: &str, id: &str| {
        ContentModifier::new(class)
            .with_property_category(PropertyCategorySpecification::new(id, "Shared"))
            .with_property_override(PropertySpecification::new("Prop").with_category(CategoryIdentifier::id(id)))
    };
    let spec = || SelectionSpec::for_classes(["Test:A", "Test:C"]).excluding("Name").excluding("Width");

    let merged = engine(
        RuleSet::new("shared")
            .with_rule(shared("Test:A", "shared"))
            .with_rule(shared("Test:C", "shared")),
    );
    let descriptor = describe(&merged, spec());
    assert_eq!(descriptor.categories().len(), 2);
    assert_eq!(descriptor.fields().len(), 1);
    let field = descriptor.field_by_name("Prop").unwrap();
    assert_eq!(field.classes.len(), 2);
    assert_eq!(chain(&descriptor, "Prop"), vec!["Shared"]);

    let split = engine(
        RuleSet::new("split")
            .with_rule(shared("Test:A", "shared_a"))
            .with_rule(shared("Test:C", "shared_c")),
    );
    let descriptor = describe(&split, spec());
    assert_eq!(descriptor.categories().len(), 3);
    assert_eq!(descriptor.fields().len(), 2);
    assert!(descriptor.field_by_name("Prop").is_some());
    assert!(descriptor.field_by_name("Prop_2").is_some());
}

#[test]
fn related_meaning_decides_default_root_ancestor() {
    let engine = engine(RuleSet::new("related"));
    let spec = |meaning| {
        SelectionSpec::for_class("Test:A").with_related_properties(
            RelatedPropertiesSpecification::new(RelationshipStep::forward("Test:AHasB")).with_meaning(meaning),
        )
    };

    let same = describe(&engine, spec(RelationshipMeaning::SameInstance));
    assert_eq!(chain(&same, "Code"), vec!["Class B", "Selected Item(s)"]);
    assert_eq!(chain(&same, "rel_B"), vec!["Selected Item(s)"]);

    let related = describe(&engine, spec(RelationshipMeaning::RelatedInstance));
    assert_eq!(chain(&related, "Code"), vec!["Class B"]);
    assert_eq!(chain(&related, "rel_B"), vec!["Class B"]);
}

#[test]
fn selection_spec_wins_priority_ties_against_modifiers() {
    let spec = SelectionSpec::for_class("Test:A")
        .with_property_category(PropertyCategorySpecification::new("spec_cat", "Spec Category"))
        .with_property_override(
            PropertySpecification::new("Name")
                .with_priority(1)
                .with_category(CategoryIdentifier::id("spec_cat")),
        );
    let modifier = |priority| {
        ContentModifier::new("Test:A")
            .with_property_category(PropertyCategorySpecification::new("mod_cat", "Modifier Category"))
            .with_property_override(
                PropertySpecification::new("Name")
                    .with_priority(priority)
                    .with_category(CategoryIdentifier::id("mod_cat")),
            )
    };

    let tie = engine(RuleSet::new("tie").with_rule(modifier(1)));
    assert_eq!(chain(&describe(&tie, spec.clone()), "Name"), vec!["Spec Category"]);

    let higher = engine(RuleSet::new("higher").with_rule(modifier(2)));
    assert_eq!(chain(&describe(&higher, spec), "Name"), vec!["Modifier Category"]);
}

#[test]
fn custom_category_parents() {
    let engine = engine(RuleSet::new("parents"));
    let spec = SelectionSpec::for_class("Test:A")
        .with_property_category(PropertyCategorySpecification::new("outer", "Outer"))
        .with_property_category(
            PropertyCategorySpecification::new("inner", "Inner").with_parent(CategoryIdentifier::id("outer")),
        )
        .with_property_category(
            PropertyCategorySpecification::new("nested", "Nested").with_parent(CategoryIdentifier::DefaultParent),
        )
        .with_property_override(PropertySpecification::new("Name").with_category(CategoryIdentifier::id("inner")))
        .with_property_override(PropertySpecification::new("Prop").with_category(CategoryIdentifier::id("nested")))
        .with_property_override(PropertySpecification::new("Width").with_category(CategoryIdentifier::id("missing")));

    let descriptor = describe(&engine, spec);
    assert_eq!(chain(&descriptor, "Name"), vec!["Inner", "Outer"]);
    assert_eq!(chain(&descriptor, "Prop"), vec!["Nested", "Selected Item(s)"]);
    assert_eq!(chain(&descriptor, "Width"), vec!["Dimensions", "Selected Item(s)"]);
}

#[test]
fn relationship_category_is_interposed_for_relationship_properties() {
    let engine = engine(RuleSet::new("relationship"));
    let spec = SelectionSpec::for_class("Test:A").with_related_properties(
        RelatedPropertiesSpecification::new(RelationshipStep::forward("Test:AHasB"))
            .with_relationship_properties(vec![PropertySpecification::new("Weight")]),
    );
    let descriptor = describe(&engine, spec);
    assert_eq!(chain(&descriptor, "Weight"), vec!["AHasB"]);
    assert_eq!(chain(&descriptor, "Code"), vec!["Class B", "AHasB"]);
}

#[test]
fn custom_category_named_like_a_class_keeps_the_class_category() {
    let engine = engine(
        RuleSet::new("colliding").with_rule(
            ContentModifier::new("Test:A")
                .with_property_category(PropertyCategorySpecification::new("Test:B", "Custom"))
                .with_property_override(
                    PropertySpecification::new("Name").with_category(CategoryIdentifier::id("Test:B")),
                ),
        ),
    );
    let spec = SelectionSpec::for_class("Test:A").with_related_properties(
        RelatedPropertiesSpecification::new(RelationshipStep::forward("Test:AHasB"))
            .with_meaning(RelationshipMeaning::RelatedInstance),
    );

    let descriptor = describe(&engine, spec);
    assert_eq!(chain(&descriptor, "Name"), vec!["Custom"]);
    assert_eq!(chain(&descriptor, "Code"), vec!["Class B"]);
    let name = descriptor.field_by_name("Name").unwrap().category;
    let code = descriptor.field_by_name("Code").unwrap().category;
    assert_ne!(name, code);
}

#[test]
fn undeclared_id_matching_a_class_degrades_to_the_default() {
    let engine = engine(RuleSet::new("undeclared"));
    let spec = SelectionSpec::for_class("Test:A")
        .with_property_override(PropertySpecification::new("Name").with_category(CategoryIdentifier::id("Test:B")))
        .with_related_properties(
            RelatedPropertiesSpecification::new(RelationshipStep::forward("Test:AHasB"))
                .with_meaning(RelationshipMeaning::RelatedInstance),
        );

    let descriptor = describe(&engine, spec);
    assert_eq!(chain(&descriptor, "Name"), vec!["Selected Item(s)"]);
    assert_eq!(chain(&descriptor, "Code"), vec!["Class B"]);
}
