use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use presentation_rules::{
    ClassDefinition, ContentModifier, DescriptorRequest, FieldBuilder, InMemoryInstanceStore, InMemorySchemaStore,
    InstanceKey, InstanceLabelOverride, LabelValueSpec, PresentationEngine, PropertySpecification,
    RelatedPropertiesSpecification, RelationshipStep, RuleIndex, RuleSet, SelectionSpec, SimpleExpressionEvaluator,
    Value,
};

const RECORDS: u64 = 256;

fn make_stores() -> (Arc<InMemorySchemaStore>, Arc<InMemoryInstanceStore>) {
    let schema = Arc::new(InMemorySchemaStore::new());

    // 16 element classes in a chain, each declaring 8 properties.
    let mut previous: Option<String> = None;
    for level in 0..16 {
        let id = format!("Bench:Element{level}");
        let mut def = ClassDefinition::new(id.as_str()).with_label(format!("Element {level}"));
        for p in 0..8 {
            def = def.with_property(format!("P{level}_{p}"));
        }
        if let Some(base) = &previous {
            def = def.with_base(base.as_str());
        }
        schema.insert_class(def).unwrap();
        previous = Some(id);
    }
    schema
        .insert_class(ClassDefinition::new("Bench:Owner").with_label("Owner").with_property("Name"))
        .unwrap();
    schema
        .insert_class(ClassDefinition::relationship("Bench:OwnerOwnsElement", "Bench:Owner", "Bench:Element0"))
        .unwrap();

    let instances = Arc::new(InMemoryInstanceStore::new(schema.clone()));
    for id in 0..RECORDS {
        instances
            .insert(
                InstanceKey::new("Bench:Element15", id),
                [("P0_0", Value::from(format!("element {}", id % 4)))],
            )
            .unwrap();
    }
    (schema, instances)
}

fn rules() -> RuleSet {
    let mut rules = RuleSet::new("bench").with_rule(InstanceLabelOverride::new(
        "Bench:Element0",
        vec![LabelValueSpec::property("Missing"), LabelValueSpec::property("P0_0")],
    ));
    for level in 0..16 {
        rules = rules.with_rule(
            ContentModifier::new(format!("Bench:Element{level}"))
                .with_priority(level)
                .with_property_override(PropertySpecification::new(format!("P{level}_0")).with_label("Renamed")),
        );
    }
    rules
}

fn selection() -> Vec<SelectionSpec> {
    vec![SelectionSpec::for_class("Bench:Element15").with_related_properties(
        RelatedPropertiesSpecification::new(RelationshipStep::backward("Bench:OwnerOwnsElement")),
    )]
}

fn bench_descriptor_build(c: &mut Criterion) {
    let (schema, _) = make_stores();
    let index = RuleIndex::new(Arc::new(rules()));
    let config = presentation_rules::EngineConfig::default();
    let specs = selection();

    c.bench_function("descriptor/build_uncached", |b| {
        b.iter(|| {
            FieldBuilder::new(schema.as_ref(), &index, &config)
                .build(&specs, presentation_rules::ContentFlags::default().with_labels())
                .unwrap()
        });
    });
}

fn bench_descriptor_cached(c: &mut Criterion) {
    let (schema, instances) = make_stores();
    let engine =
        PresentationEngine::new(schema, instances, Arc::new(SimpleExpressionEvaluator::new()), rules()).unwrap();
    let request = DescriptorRequest::new(selection());
    engine.descriptor(&request).unwrap();

    c.bench_function("descriptor/build_cached", |b| {
        b.iter(|| engine.descriptor(&request).unwrap());
    });
}

fn bench_labels(c: &mut Criterion) {
    let (schema, instances) = make_stores();
    let engine =
        PresentationEngine::new(schema, instances, Arc::new(SimpleExpressionEvaluator::new()), rules()).unwrap();
    let keys: Vec<_> = (0..RECORDS).map(|id| InstanceKey::new("Bench:Element15", id)).collect();

    let mut group = c.benchmark_group("labels");
    group.throughput(Throughput::Elements(RECORDS));
    group.bench_function("merged_sequential", |b| {
        b.iter(|| engine.merged_display_label(&keys).unwrap());
    });
    group.bench_function("parallel", |b| {
        b.iter(|| engine.display_labels(&keys).unwrap());
    });
    let pool = engine.label_pool().unwrap();
    group.bench_function("merged_pool", |b| {
        b.iter(|| pool.merged_label(&keys).unwrap());
    });
    group.finish();
    pool.shutdown();
}

criterion_group!(benches, bench_descriptor_build, bench_descriptor_cached, bench_labels);
criterion_main!(benches);
