//! Content descriptors.
//!
//! A [`ContentDescriptor`] is the static shape of a content request: the
//! fields it returns and the category tree they are shown under. It does
//! not depend on record data and is immutable once built.

mod builder;
mod category;
mod field;

use serde::Serialize;

use crate::class::ClassId;
use crate::content::ContentFlags;

pub use builder::FieldBuilder;
pub use category::{
    Category, CategoryBuilder, CategoryContext, CategoryKind, CategoryRef, CategoryScope, CategoryStack, CategoryTree,
    RelatedLevelCategories,
};
pub use field::{Field, FieldKind, FieldRef, FieldTree, PropertySource, DISPLAY_LABEL_FIELD_NAME};

/// Fields and categories of one request shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDescriptor {
    categories: CategoryTree,
    fields: FieldTree,
    default_category: CategoryRef,
    selected_classes: Vec<ClassId>,
    flags: ContentFlags,
}

impl ContentDescriptor {
    pub(crate) fn new(
        categories: CategoryTree,
        fields: FieldTree,
        default_category: CategoryRef,
        selected_classes: Vec<ClassId>,
        flags: ContentFlags,
    ) -> Self {
        Self {
            categories,
            fields,
            default_category,
            selected_classes,
            flags,
        }
    }

    /// Category tree.
    #[must_use]
    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    /// Field tree.
    #[must_use]
    pub fn fields(&self) -> &FieldTree {
        &self.fields
    }

    /// The default root category.
    #[must_use]
    pub const fn default_category(&self) -> CategoryRef {
        self.default_category
    }

    /// Selected classes in selection order.
    #[must_use]
    pub fn selected_classes(&self) -> &[ClassId] {
        &self.selected_classes
    }

    /// Flags the descriptor was built for.
    #[must_use]
    pub const fn flags(&self) -> ContentFlags {
        self.flags
    }

    /// Field with the given unique name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.find(name).and_then(|r| self.fields.get(r))
    }

    /// The display-label field, if present.
    #[must_use]
    pub fn display_label_field(&self) -> Option<&Field> {
        self.field_by_name(DISPLAY_LABEL_FIELD_NAME)
    }

    /// Category of `field`.
    #[must_use]
    pub fn category_of(&self, field: &Field) -> Option<&Category> {
        self.categories.get(field.category)
    }
}
