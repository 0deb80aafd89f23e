//! Resolved resource model: config validated and flattened for runtime use.

use crate::config::FieldKind;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the server-assigned identity field on every resource.
pub const ID_FIELD: &str = "id";

/// One of the five generated CRUD operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Operation::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Already coerced to `kind`.
    pub default: Option<Value>,
    pub required: bool,
    pub secret: bool,
}

impl FieldSpec {
    pub fn is_identity(&self) -> bool {
        self.name == ID_FIELD
    }
}

/// Schema descriptor for one resource kind. Immutable after `resolve`.
#[derive(Clone, Debug)]
pub struct ResourceSchema {
    pub name: String,
    pub path_segment: String,
    pub table: String,
    /// Declared order; the identity field is always first.
    pub fields: Vec<FieldSpec>,
    /// Subset of `fields`, in response order.
    pub render_fields: Vec<String>,
    pub operations: Vec<Operation>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field usable in filter and ordering expressions. Secret fields never resolve.
    pub fn queryable_field(&self, name: &str) -> Option<&FieldSpec> {
        self.field(name).filter(|f| !f.secret)
    }

    /// Declared fields other than the identity field.
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_identity())
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }
}

/// All resources, in declaration order. Shared read-only across requests.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Arc<ResourceSchema>>,
    by_name: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl ResourceRegistry {
    pub(crate) fn from_resources(resources: Vec<ResourceSchema>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_path = HashMap::new();
        for (i, r) in resources.iter().enumerate() {
            by_name.insert(r.name.clone(), i);
            by_path.insert(r.path_segment.clone(), i);
        }
        ResourceRegistry {
            resources: resources.into_iter().map(Arc::new).collect(),
            by_name,
            by_path,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceSchema>> {
        self.by_name.get(name).map(|&i| &self.resources[i])
    }

    pub fn by_path(&self, path_segment: &str) -> Option<&Arc<ResourceSchema>> {
        self.by_path.get(path_segment).map(|&i| &self.resources[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceSchema>> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
