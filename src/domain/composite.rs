//! Composite leaves: fixed, ordered tuples of child leaves.
//!
//! Each composite type declares a static [`Schema`]. Construction creates
//! one child per field in order, and serialization walks the same schema.

use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::graph::Graph;
use crate::domain::node::NodeId;
use crate::domain::leaf::{Scalar, Validate};
use crate::domain::types::names;

/// Initial value of a field, usable in `static` schemas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preset {
    Number(f64),
    Text(&'static str),
    Boolean(bool),
}

impl From<Preset> for Scalar {
    fn from(p: Preset) -> Self {
        match p {
            Preset::Number(v) => Scalar::Number(v),
            Preset::Text(v) => Scalar::Text(v.to_string()),
            Preset::Boolean(v) => Scalar::Boolean(v),
        }
    }
}

/// One declared child of a composite: name, type and per-field overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub type_name: &'static str,
    pub default: Option<Preset>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: &'static [&'static str],
    pub unit: Option<&'static str>,
}

impl Field {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            type_name,
            default: None,
            min: None,
            max: None,
            one_of: &[],
            unit: None,
        }
    }

    pub const fn default_number(self, v: f64) -> Self {
        Self {
            default: Some(Preset::Number(v)),
            ..self
        }
    }

    pub const fn default_text(self, v: &'static str) -> Self {
        Self {
            default: Some(Preset::Text(v)),
            ..self
        }
    }

    pub const fn range(self, min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..self
        }
    }

    /// Rejects zero and negative numbers.
    pub const fn positive(self) -> Self {
        Self {
            min: Some(f64::MIN_POSITIVE),
            ..self
        }
    }

    pub const fn one_of(self, values: &'static [&'static str]) -> Self {
        Self {
            one_of: values,
            ..self
        }
    }

    pub const fn unit(self, unit: &'static str) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }
}

/// Derived state a composite recomputes during `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    GeoPosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schema {
    pub fields: &'static [Field],
    pub derivation: Option<Derivation>,
}

impl Schema {
    pub const fn plain(fields: &'static [Field]) -> Self {
        Self {
            fields,
            derivation: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub const EULER_ORDERS: &[&str] = &["XYZ", "YZX", "ZXY", "XZY", "YXZ", "ZYX"];

const VECTOR_FIELDS: &[Field] = &[
    Field::new("x", names::DISTANCE),
    Field::new("y", names::DISTANCE),
    Field::new("z", names::DISTANCE),
];

pub static VECTOR_SCHEMA: Schema = Schema::plain(VECTOR_FIELDS);

const QUATERNION_FIELDS: &[Field] = &[
    Field::new("x", names::NUMBER).default_number(0.0),
    Field::new("y", names::NUMBER).default_number(0.0),
    Field::new("z", names::NUMBER).default_number(0.0),
    Field::new("w", names::NUMBER).default_number(1.0),
];

pub static QUATERNION_SCHEMA: Schema = Schema::plain(QUATERNION_FIELDS);

const COLOR_FIELDS: &[Field] = &[
    Field::new("r", names::NUMBER).range(0.0, 1.0),
    Field::new("g", names::NUMBER).range(0.0, 1.0),
    Field::new("b", names::NUMBER).range(0.0, 1.0),
    Field::new("a", names::NUMBER).range(0.0, 1.0).default_number(1.0),
];

pub static COLOR_SCHEMA: Schema = Schema::plain(COLOR_FIELDS);

const EULER_FIELDS: &[Field] = &[
    Field::new("x", names::ANGLE),
    Field::new("y", names::ANGLE),
    Field::new("z", names::ANGLE),
    Field::new("order", names::STRING)
        .one_of(EULER_ORDERS)
        .default_text("XYZ"),
];

pub static EULER_SCHEMA: Schema = Schema::plain(EULER_FIELDS);

impl Graph {
    /// Numeric values of the first `N` schema fields of a composite.
    pub(crate) fn components<const N: usize>(&self, id: NodeId) -> DomainResult<[f64; N]> {
        let schema = self.schema(id)?;
        let mut out = [0.0; N];
        for (slot, field) in out.iter_mut().zip(schema.fields) {
            let child = self.child(id, field.name)?;
            *slot = self.number(child)?.unwrap_or(0.0);
        }
        Ok(out)
    }

    /// Assigns the first `N` schema fields of a composite.
    ///
    /// Every component is checked before any is written, so a rejected
    /// assignment leaves the composite unchanged.
    pub(crate) fn set_components<const N: usize>(
        &mut self,
        id: NodeId,
        values: [f64; N],
    ) -> DomainResult<()> {
        let schema = self.schema(id)?;
        let mut targets = Vec::with_capacity(N);
        for (value, field) in values.into_iter().zip(schema.fields) {
            let child = self.child(id, field.name)?;
            let candidate = Scalar::Number(value);
            self.leaf(child)?
                .check_value(Some(&candidate))
                .map_err(|r| DomainError::validation(field.name, r.reason))?;
            targets.push((child, candidate));
        }
        for (child, candidate) in targets {
            self.set_value(child, Some(candidate))?;
        }
        Ok(())
    }

    /// Euclidean norm of a vector.
    pub fn vector_length(&self, id: NodeId) -> DomainResult<f64> {
        self.expect_type(id, names::VECTOR)?;
        let [x, y, z] = self.components::<3>(id)?;
        Ok((x * x + y * y + z * z).sqrt())
    }

    /// Rescales a vector to `length`, keeping its direction.
    ///
    /// A zero vector has no direction and is rejected, as is a negative or
    /// non-finite length.
    #[instrument(level = "debug", skip(self))]
    pub fn set_vector_length(&mut self, id: NodeId, length: f64) -> DomainResult<()> {
        self.expect_type(id, names::VECTOR)?;
        if !(length.is_finite() && length >= 0.0) {
            return Err(DomainError::validation(
                self.node(id)?.name(),
                format!("vector length must be finite and not negative, got {}", length),
            ));
        }
        let current = self.vector_length(id)?;
        if current == 0.0 {
            return Err(DomainError::validation(
                self.node(id)?.name(),
                "cannot rescale a zero vector",
            ));
        }
        let scale = length / current;
        let [x, y, z] = self.components::<3>(id)?;
        self.set_components(id, [x * scale, y * scale, z * scale])
    }

    pub fn set_vector(&mut self, id: NodeId, xyz: [f64; 3]) -> DomainResult<()> {
        self.expect_type(id, names::VECTOR)?;
        self.set_components(id, xyz)
    }

    pub fn vector(&self, id: NodeId) -> DomainResult<[f64; 3]> {
        self.expect_type(id, names::VECTOR)?;
        self.components(id)
    }
}
