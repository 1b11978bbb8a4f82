//! Index registrations
//!
//! A schema names the primary key attribute, owns the primary index and
//! lists secondary indices in registration order. The primary index is
//! always the first binding, on `id_attr`.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::index::{IndexCursor, Operator, PrimaryIndex};

/// What a registered index serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// Comparison clauses on a dotted path
    Path(String),
    /// A custom top-level operator such as `$text`
    Operator(String),
}

#[derive(Clone)]
pub struct IndexBinding {
    pub index: Arc<dyn IndexCursor>,
    pub target: BindingTarget,
    /// Lookups go through `PrimaryIndex::records` so hits land in the cache
    pub is_primary: bool,
}

impl fmt::Debug for IndexBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBinding")
            .field("index", &self.index.name())
            .field("target", &self.target)
            .field("is_primary", &self.is_primary)
            .finish()
    }
}

#[derive(Clone)]
pub struct Schema {
    id_attr: String,
    primary: Arc<dyn PrimaryIndex>,
    bindings: Vec<IndexBinding>,
}

impl Schema {
    pub fn new<P>(id_attr: impl Into<String>, primary: Arc<P>) -> Self
    where
        P: PrimaryIndex + 'static,
    {
        let id_attr = id_attr.into();
        let cursor: Arc<dyn IndexCursor> = primary.clone();
        Self {
            bindings: vec![IndexBinding {
                index: cursor,
                target: BindingTarget::Path(id_attr.clone()),
                is_primary: true,
            }],
            id_attr,
            primary,
        }
    }

    /// Register an index for comparison clauses on `path`
    pub fn bind_path(mut self, path: impl Into<String>, index: Arc<dyn IndexCursor>) -> Self {
        self.bindings.push(IndexBinding {
            index,
            target: BindingTarget::Path(path.into()),
            is_primary: false,
        });
        self
    }

    /// Register an index for a custom operator
    pub fn bind_operator(mut self, operator: impl Into<String>, index: Arc<dyn IndexCursor>) -> Self {
        self.bindings.push(IndexBinding {
            index,
            target: BindingTarget::Operator(operator.into()),
            is_primary: false,
        });
        self
    }

    pub fn id_attr(&self) -> &str {
        &self.id_attr
    }

    pub fn primary(&self) -> &Arc<dyn PrimaryIndex> {
        &self.primary
    }

    pub fn bindings(&self) -> &[IndexBinding] {
        &self.bindings
    }

    pub fn binding(&self, position: usize) -> Option<&IndexBinding> {
        self.bindings.get(position)
    }

    /// Returns true if some binding registers `name` as a custom operator
    pub fn is_custom_operator(&self, name: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| matches!(&b.target, BindingTarget::Operator(op) if op == name))
    }

    /// First binding on `path` that accepts the clause
    pub fn path_binding(&self, path: &str, operator: &Operator, value: &Value) -> Option<usize> {
        self.bindings.iter().position(|b| {
            matches!(&b.target, BindingTarget::Path(p) if p == path) && b.index.test_indice(operator, value)
        })
    }

    /// First binding for a custom operator that accepts `value`
    pub fn operator_binding(&self, name: &str, value: &Value) -> Option<usize> {
        let operator = Operator::Custom(name.to_string());
        self.bindings.iter().position(|b| {
            matches!(&b.target, BindingTarget::Operator(op) if op == name) && b.index.test_indice(&operator, value)
        })
    }

    /// First sort-capable binding on `path`
    pub fn sort_binding(&self, path: &str) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| matches!(&b.target, BindingTarget::Path(p) if p == path) && b.index.can_sort())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id_attr", &self.id_attr)
            .field("primary", &self.primary.name())
            .field("bindings", &self.bindings)
            .finish()
    }
}
