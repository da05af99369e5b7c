//! Descriptor construction.

use tracing::{debug, trace, warn};

use crate::class::{ClassId, PropertyInfo};
use crate::config::EngineConfig;
use crate::content::ContentFlags;
use crate::descriptor::category::{CategoryBuilder, CategoryContext, CategoryRef, CategoryScope, CategoryStack};
use crate::descriptor::field::{Field, FieldKind, FieldRef, FieldTree, PropertySource, DISPLAY_LABEL_FIELD_NAME};
use crate::descriptor::ContentDescriptor;
use crate::error::{PresentationError, PresentationResult, ValidationError};
use crate::expression::Expr;
use crate::index::RuleIndex;
use crate::resolver::{resolve_property, OverrideScope, ScopedSpecs};
use crate::rules::{
    selects, ContentModifier, ContentOverrides, PropertyCategorySpecification, PropertySpecification,
    RelatedPropertiesSpecification, Rule, RuleKind, SelectionSpec,
};
use crate::store::SchemaStore;

/// A field with its not-yet-placed children.
struct FieldDraft {
    field: Field,
    children: Vec<FieldDraft>,
}

impl FieldDraft {
    const fn leaf(field: Field) -> Self {
        Self {
            field,
            children: Vec::new(),
        }
    }
}

fn place(tree: &mut FieldTree, parent: Option<FieldRef>, draft: FieldDraft) {
    let r = tree.merge_or_insert(parent, draft.field);
    for child in draft.children {
        place(tree, Some(r), child);
    }
}

fn property_field(
    property: &PropertyInfo,
    label: Option<String>,
    category: CategoryRef,
    source: PropertySource,
    class: &ClassId,
) -> Field {
    let label = label.unwrap_or_else(|| property.display_label().to_string());
    Field::new(
        &property.name,
        label,
        category,
        FieldKind::Property {
            property: property.name.clone(),
            property_type: property.property_type,
            source,
        },
    )
    .with_class(class.clone())
}

/// Builds a [`ContentDescriptor`] from selection specifications.
pub struct FieldBuilder<'a> {
    schema: &'a dyn SchemaStore,
    index: &'a RuleIndex,
    config: &'a EngineConfig,
    categories: CategoryBuilder<'a>,
    drafts: Vec<FieldDraft>,
    selected: Vec<ClassId>,
    calculated: Vec<(String, Expr)>,
}

impl<'a> FieldBuilder<'a> {
    /// Creates a builder.
    ///
    /// The default root category comes from the first class-less
    /// `DefaultPropertyCategoryOverride`, else from `config`.
    #[must_use]
    pub fn new(schema: &'a dyn SchemaStore, index: &'a RuleIndex, config: &'a EngineConfig) -> Self {
        let default_root = index
            .global(RuleKind::DefaultPropertyCategoryOverride)
            .into_iter()
            .find_map(|m| match m.rule {
                Rule::DefaultPropertyCategoryOverride(r) => Some(r.category.clone()),
                _ => None,
            })
            .unwrap_or_else(|| config.default_category());
        Self::with_default_category(schema, index, config, &default_root)
    }

    fn with_default_category(
        schema: &'a dyn SchemaStore,
        index: &'a RuleIndex,
        config: &'a EngineConfig,
        default_root: &PropertyCategorySpecification,
    ) -> Self {
        Self {
            schema,
            index,
            config,
            categories: CategoryBuilder::new(schema, default_root),
            drafts: Vec::new(),
            selected: Vec::new(),
            calculated: Vec::new(),
        }
    }

    /// `CalculatedProperty_{n}`, numbered per descriptor; the same label and
    /// expression keep one number across classes.
    fn calculated_name(&mut self, label: &str, expr: &Expr) -> String {
        let n = match self.calculated.iter().position(|(l, e)| l == label && e == expr) {
            Some(n) => n,
            None => {
                self.calculated.push((label.to_string(), expr.clone()));
                self.calculated.len() - 1
            }
        };
        format!("CalculatedProperty_{n}")
    }

    fn modifiers(&self, class: &ClassId) -> PresentationResult<Vec<&'a ContentModifier>> {
        let index = self.index;
        Ok(index
            .rules_for(self.schema, class, RuleKind::ContentModifier)?
            .into_iter()
            .filter_map(|m| match m.rule {
                Rule::ContentModifier(r) => Some(r),
                _ => None,
            })
            .collect())
    }

    fn has_label_rules(&self, class: &ClassId) -> PresentationResult<bool> {
        if !self.index.global(RuleKind::LabelOverride).is_empty() {
            return Ok(true);
        }
        Ok(!self
            .index
            .rules_for(self.schema, class, RuleKind::InstanceLabelOverride)?
            .is_empty())
    }

    /// Builds the descriptor for `specs`.
    pub fn build(mut self, specs: &[SelectionSpec], flags: ContentFlags) -> PresentationResult<ContentDescriptor> {
        for spec in specs {
            for class in &spec.classes {
                if class.is_empty() {
                    return Err(ValidationError::EmptyClassName.into());
                }
                if !self.selected.contains(class) {
                    self.selected.push(class.clone());
                }
                if !flags.keys_only {
                    self.add_class(spec, class)?;
                }
            }
        }

        let mut with_label_field = false;
        if flags.show_labels && !flags.keys_only {
            with_label_field = flags.merge_results;
            for class in &self.selected {
                if with_label_field {
                    break;
                }
                with_label_field = self.has_label_rules(class)?;
            }
        }

        let Self {
            categories,
            drafts,
            selected,
            ..
        } = self;

        let mut fields = FieldTree::default();
        if with_label_field {
            let label_field = Field::new(
                DISPLAY_LABEL_FIELD_NAME,
                "Label",
                categories.default_root(),
                FieldKind::DisplayLabel,
            );
            fields.merge_or_insert(None, label_field);
        }
        for draft in drafts {
            place(&mut fields, None, draft);
        }

        let default_root = categories.default_root();
        let (categories, remap) = categories.finish(&fields.referenced_categories());
        fields.remap_categories(&remap);
        fields.assign_unique_names();
        let default_root = remap.get(&default_root).copied().unwrap_or(default_root);

        debug!(
            classes = selected.len(),
            fields = fields.len(),
            categories = categories.len(),
            "descriptor built"
        );
        Ok(ContentDescriptor::new(categories, fields, default_root, selected, flags))
    }

    fn add_class(&mut self, spec: &SelectionSpec, class: &ClassId) -> PresentationResult<()> {
        let modifiers = self.modifiers(class)?;
        let mut layers: Vec<&ContentOverrides> = vec![&spec.content];
        layers.extend(modifiers.iter().map(|m| &m.content));

        let mut specs = vec![ScopedSpecs::new(OverrideScope::Selection, &spec.content.property_overrides)];
        specs.extend(
            modifiers
                .iter()
                .map(|m| ScopedSpecs::new(OverrideScope::ClassModifier, &m.content.property_overrides)),
        );
        let scope = CategoryScope::new(layers.clone());
        let ctx = self.categories.direct_context();

        let properties = self
            .schema
            .declared_properties(class)
            .map_err(PresentationError::schema)?;
        for property in &properties {
            if spec.excludes(&property.name) {
                continue;
            }
            let resolved = resolve_property(&specs, &property.name);
            if !resolved.displayed {
                trace!(class = %class, property = %property.name, "property hidden");
                continue;
            }
            let category = self.categories.resolve(
                ctx,
                resolved.category.as_ref(),
                &scope,
                property.category.as_deref(),
            )?;
            self.drafts.push(FieldDraft::leaf(property_field(
                property,
                resolved.label,
                category,
                PropertySource::Instance,
                class,
            )));
        }

        for rps in layers.iter().flat_map(|l| l.related_properties.iter()) {
            if let Some(draft) = self.related_level(rps, class, &CategoryStack::default(), &layers, 1)? {
                self.drafts.push(draft);
            }
        }

        for calc in layers.iter().flat_map(|l| l.calculated_properties.iter()) {
            let field = Field::new(
                self.calculated_name(&calc.label, &calc.value),
                &calc.label,
                self.categories.default_root(),
                FieldKind::Calculated {
                    expr: calc.value.clone(),
                    priority: calc.priority,
                },
            )
            .with_class(class.clone());
            self.drafts.push(FieldDraft::leaf(field));
        }

        debug!(class = %class, properties = properties.len(), "class processed");
        Ok(())
    }

    fn push_properties(
        &mut self,
        children: &mut Vec<FieldDraft>,
        class: &ClassId,
        selected: &[PropertySpecification],
        ctx: CategoryContext,
        scope: &CategoryScope<'_>,
        source: PropertySource,
    ) -> PresentationResult<()> {
        if selected.is_empty() {
            return Ok(());
        }
        let modifiers = self.modifiers(class)?;
        let mut specs = vec![ScopedSpecs::new(OverrideScope::RelatedProperty, selected)];
        specs.extend(
            modifiers
                .iter()
                .map(|m| ScopedSpecs::new(OverrideScope::ClassModifier, &m.content.property_overrides)),
        );

        let properties = self
            .schema
            .declared_properties(class)
            .map_err(PresentationError::schema)?;
        for property in properties.iter().filter(|p| selects(selected, &p.name)) {
            let resolved = resolve_property(&specs, &property.name);
            if !resolved.displayed {
                continue;
            }
            let category = self.categories.resolve(
                ctx,
                resolved.category.as_ref(),
                scope,
                property.category.as_deref(),
            )?;
            children.push(FieldDraft::leaf(property_field(
                property,
                resolved.label,
                category,
                source,
                class,
            )));
        }
        Ok(())
    }

    fn related_level(
        &mut self,
        rps: &RelatedPropertiesSpecification,
        source_class: &ClassId,
        stack: &CategoryStack,
        layers: &[&ContentOverrides],
        depth: usize,
    ) -> PresentationResult<Option<FieldDraft>> {
        if depth > self.config.max_nesting_depth {
            warn!(depth, max = self.config.max_nesting_depth, "related properties nest too deep, level skipped");
            return Ok(None);
        }
        let Some(path) = rps.path.normalize() else {
            return Ok(None);
        };
        let Some(related_class) = path.target_class(self.schema).map_err(PresentationError::schema)? else {
            warn!(
                relationship = %path.last_step().relationship,
                "related class cannot be determined, level skipped"
            );
            return Ok(None);
        };
        let relationship = path.last_step().relationship.clone();

        let has_relationship_properties = !rps.relationship_properties.is_empty()
            && self
                .schema
                .declared_properties(&relationship)
                .map_err(PresentationError::schema)?
                .iter()
                .any(|p| selects(&rps.relationship_properties, &p.name));
        let level = self.categories.related_level(
            stack,
            rps.meaning,
            &relationship,
            &related_class,
            has_relationship_properties || rps.force_relationship_category,
        )?;

        let related_modifiers = self.modifiers(&related_class)?;
        let mut scope_layers: Vec<&ContentOverrides> = Vec::with_capacity(layers.len() + related_modifiers.len());
        scope_layers.extend(layers.first().copied());
        scope_layers.extend(related_modifiers.iter().map(|m| &m.content));
        scope_layers.extend(layers.iter().skip(1).copied());
        let scope = CategoryScope::new(scope_layers.clone());

        let mut children = Vec::new();
        self.push_properties(
            &mut children,
            &related_class,
            &rps.properties,
            level.properties,
            &scope,
            PropertySource::Instance,
        )?;
        if has_relationship_properties {
            self.push_properties(
                &mut children,
                &relationship,
                &rps.relationship_properties,
                level.relationship,
                &scope,
                PropertySource::Relationship,
            )?;
        }
        for nested in &rps.nested {
            if let Some(draft) = self.related_level(nested, &related_class, &level.nested, &scope_layers, depth + 1)? {
                children.push(draft);
            }
        }

        if children.is_empty() {
            debug!(related = %related_class, "related level is empty, dropped");
            return Ok(None);
        }

        let label = self
            .schema
            .display_label(&related_class)
            .map_err(PresentationError::schema)?;
        let field = Field::new(
            format!("rel_{}", related_class.short_name()),
            label,
            level.field,
            FieldKind::Nested {
                path,
                related_class: related_class.clone(),
                meaning: rps.meaning,
                auto_expand: rps.auto_expand,
            },
        )
        .with_class(source_class.clone());
        debug!(related = %related_class, children = children.len(), depth, "related level materialized");
        Ok(Some(FieldDraft { field, children }))
    }
}
