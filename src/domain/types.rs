//! Type registry: names, subtype chains and construction blueprints.
//!
//! The registry is an explicit context object owned by a [`Graph`]; there is
//! no process-wide registry.
//!
//! [`Graph`]: crate::domain::graph::Graph

use std::collections::HashMap;
use std::fmt;

use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::composite::{
    Schema, COLOR_SCHEMA, EULER_SCHEMA, QUATERNION_SCHEMA, VECTOR_SCHEMA,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::geo::{GEO_FRAME_SCHEMA, GEO_POSITION_SCHEMA};
use crate::domain::units::{Unit, ANGLE_UNITS, LENGTH_UNITS, TIME_UNITS};

/// Names of the built-in types.
pub mod names {
    pub const ITEM: &str = "item";
    pub const SIMPLE: &str = "simple";
    pub const NUMBER: &str = "number";
    pub const MEASURE: &str = "measure";
    pub const ANGLE: &str = "angle";
    pub const DISTANCE: &str = "distance";
    pub const SIZE: &str = "size";
    pub const TIME: &str = "time";
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const COMPLEX: &str = "complex";
    pub const VECTOR: &str = "vector";
    pub const QUATERNION: &str = "quaternion";
    pub const COLOR: &str = "color";
    pub const EULER: &str = "euler";
    pub const GEO_FRAME: &str = "geo_frame";
    pub const GEO_POSITION: &str = "geo_position";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

/// How to build the scalar leaf of a type.
#[derive(Debug, Clone, Copy)]
pub enum LeafTemplate {
    Number,
    Text,
    Boolean,
    Measure { units: &'static [Unit] },
}

/// Static construction metadata of a type.
#[derive(Debug, Clone, Copy)]
pub enum Blueprint {
    /// Generic container of arbitrary items.
    Group,
    Leaf(LeafTemplate),
    Composite(&'static Schema),
}

#[derive(Debug)]
struct TypeEntry {
    name: String,
    parent: Option<TypeId>,
    children: Vec<TypeId>,
    blueprint: Option<Blueprint>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in node types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_builtins()
            .unwrap_or_else(|e| unreachable!("built-in type table is consistent: {e}"));
        registry
    }

    fn register_builtins(&mut self) -> DomainResult<()> {
        let leaf = |template| Some(Blueprint::Leaf(template));

        let item = self.register_with(names::ITEM, None, Some(Blueprint::Group))?;
        let simple = self.register(names::SIMPLE, Some(item))?;
        let number = self.register_with(names::NUMBER, Some(simple), leaf(LeafTemplate::Number))?;
        let measure = self.register_with(
            names::MEASURE,
            Some(number),
            leaf(LeafTemplate::Measure { units: &[] }),
        )?;
        for (name, units) in [
            (names::ANGLE, ANGLE_UNITS),
            (names::DISTANCE, LENGTH_UNITS),
            (names::SIZE, LENGTH_UNITS),
            (names::TIME, TIME_UNITS),
        ] {
            self.register_with(name, Some(measure), leaf(LeafTemplate::Measure { units }))?;
        }
        self.register_with(names::STRING, Some(simple), leaf(LeafTemplate::Text))?;
        self.register_with(names::BOOLEAN, Some(simple), leaf(LeafTemplate::Boolean))?;

        let complex = self.register(names::COMPLEX, Some(item))?;
        for (name, schema) in [
            (names::VECTOR, &VECTOR_SCHEMA),
            (names::QUATERNION, &QUATERNION_SCHEMA),
            (names::COLOR, &COLOR_SCHEMA),
            (names::EULER, &EULER_SCHEMA),
        ] {
            self.register_with(name, Some(complex), Some(Blueprint::Composite(schema)))?;
        }
        self.register_with(
            names::GEO_FRAME,
            Some(item),
            Some(Blueprint::Composite(&GEO_FRAME_SCHEMA)),
        )?;
        self.register_with(
            names::GEO_POSITION,
            Some(item),
            Some(Blueprint::Composite(&GEO_POSITION_SCHEMA)),
        )?;
        Ok(())
    }

    /// Registers a type without a blueprint (it cannot be instantiated).
    pub fn register(&mut self, name: &str, parent: Option<TypeId>) -> DomainResult<TypeId> {
        self.register_with(name, parent, None)
    }

    /// Registers a type. Duplicate names are rejected; the first registration stays.
    #[instrument(level = "debug", skip(self, blueprint))]
    pub fn register_with(
        &mut self,
        name: &str,
        parent: Option<TypeId>,
        blueprint: Option<Blueprint>,
    ) -> DomainResult<TypeId> {
        if self.by_name.contains_key(name) {
            return Err(DomainError::DuplicateTypeName(name.to_string()));
        }
        if let Some(p) = parent {
            if p.0 >= self.entries.len() {
                return Err(DomainError::UnknownType(format!("parent #{} of {}", p.0, name)));
            }
        }
        let id = TypeId(self.entries.len());
        self.entries.push(TypeEntry {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            blueprint,
        });
        if let Some(p) = parent {
            self.entries[p.0].children.push(id);
        }
        self.by_name.insert(name.to_string(), id);
        debug!("registered type {}", name);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup(&self, name: &str) -> DomainResult<TypeId> {
        self.get(name)
            .ok_or_else(|| DomainError::UnknownType(name.to_string()))
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.entries[id.0].name
    }

    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        self.entries[id.0].parent
    }

    pub fn children(&self, id: TypeId) -> &[TypeId] {
        &self.entries[id.0].children
    }

    pub fn blueprint(&self, id: TypeId) -> Option<Blueprint> {
        self.entries[id.0].blueprint
    }

    /// True iff `other` lies on the chain from `id` up to the root (inclusive).
    pub fn is(&self, id: TypeId, other: TypeId) -> bool {
        let mut current = Some(id);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = self.parent(t);
        }
        false
    }

    /// Name-based variant of [`TypeRegistry::is`]; unknown names are never related.
    pub fn is_named(&self, id: TypeId, other: &str) -> bool {
        self.get(other).is_some_and(|o| self.is(id, o))
    }

    /// Chain from `id` up to its root, `id` first.
    pub fn ancestry(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(p) = self.parent(current) {
            chain.push(p);
            current = p;
        }
        chain
    }

    pub fn roots(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.parent.is_none())
            .map(|(i, _)| TypeId(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the subtype hierarchy below `root`.
    pub fn to_tree(&self, root: TypeId) -> Tree<String> {
        let label = match self.blueprint(root) {
            None => format!("{} (abstract)", self.name(root)),
            Some(_) => self.name(root).to_string(),
        };
        Tree::new(label).with_leaves(self.children(root).iter().map(|&c| self.to_tree(c)))
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
