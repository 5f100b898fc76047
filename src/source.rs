//! Heterogeneous source collections handed to mappers.

use std::any::{Any, TypeId, type_name};
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::MissingSourceError;

pub(crate) type Dynamic = Arc<dyn Any + Send + Sync>;

/// Declares the lineage-relevant shape of a type: the entity name used in
/// lineage entries and the fields a mapping may read from or write to.
///
/// ```
/// use lineage::Entity;
///
/// struct PocoX {
///     id: i32,
///     name: String,
/// }
///
/// impl Entity for PocoX {
///     const NAME: &'static str = "PocoX";
///     const FIELDS: &'static [&'static str] = &["Id", "Name"];
/// }
/// ```
pub trait Entity: Any + Send + Sync {
    const NAME: &'static str;
    const FIELDS: &'static [&'static str];

    fn has_field(field: &str) -> bool {
        Self::FIELDS.contains(&field)
    }
}

/// Strips the module path and generic arguments from a type name, so
/// `alloc::vec::Vec<u8>` becomes `Vec`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[derive(Clone)]
struct Source {
    refl_type: TypeId,
    refl_name: &'static str,
    /// `None` for sources registered without an [`Entity`] descriptor.
    fields: Option<&'static [&'static str]>,
    /// `None` stands for a null source.
    data: Option<Dynamic>,
}

/// A view of one element of [`Sources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Declared entity name, or the short type name for untyped sources.
    pub entity: &'static str,
    /// Declared fields, if the source was registered through [`Entity`].
    pub fields: Option<&'static [&'static str]>,
    pub is_null: bool,
}

/// An ordered collection of already-materialized source objects of mixed
/// types, possibly containing nulls.
#[derive(Clone, Default)]
pub struct Sources {
    items: Vec<Source>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Entity>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Entity>(&mut self, value: T) {
        self.push_opt(Some(value));
    }

    /// Adds a possibly-null source of a declared type.
    pub fn push_opt<T: Entity>(&mut self, value: Option<T>) {
        self.items.push(Source {
            refl_type: TypeId::of::<T>(),
            refl_name: T::NAME,
            fields: Some(T::FIELDS),
            data: value.map(|v| Arc::new(v) as Dynamic),
        });
    }

    /// Adds a source that carries no [`Entity`] descriptor. Lineage for it can
    /// only name its type.
    pub fn push_dynamic<T: Any + Send + Sync>(&mut self, value: T) {
        self.items.push(Source {
            refl_type: TypeId::of::<T>(),
            refl_name: short_type_name::<T>(),
            fields: None,
            data: Some(Arc::new(value)),
        });
    }

    /// Merges several source groups into one, keeping their order.
    pub fn flatten(groups: impl IntoIterator<Item = Sources>) -> Self {
        Self {
            items: groups.into_iter().flat_map(|group| group.items).collect(),
        }
    }

    /// First non-null source of type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.all::<T>().next()
    }

    /// Like [`get`](Self::get), but a missing source is an error.
    pub fn require<T: Entity>(&self) -> Result<&T, MissingSourceError> {
        self.get::<T>()
            .ok_or_else(|| MissingSourceError::new(T::NAME))
    }

    /// Every non-null source of type `T`, in insertion order.
    pub fn all<T: Any>(&self) -> impl Iterator<Item = &T> {
        let ty = TypeId::of::<T>();
        self.items
            .iter()
            .filter(move |item| item.refl_type == ty)
            .filter_map(|item| item.data.as_deref())
            .filter_map(|data| data.downcast_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = SourceInfo> + '_ {
        self.items.iter().map(|item| SourceInfo {
            entity: item.refl_name,
            fields: item.fields,
            is_null: item.data.is_none(),
        })
    }

    /// The first null source, if any.
    pub fn first_null(&self) -> Option<SourceInfo> {
        self.iter().find(|info| info.is_null)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
