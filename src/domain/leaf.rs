//! Scalar leaves: validated single values.
//!
//! Four closed variants share the [`Validate`] capability: numbers, text,
//! booleans and measures (numbers carrying a display unit table).

use std::fmt;

use regex::Regex;

use crate::domain::units::{find_unit, Unit};

/// Raw value held by a scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Scalar::Number(_) => "number",
            Scalar::Text(_) => "string",
            Scalar::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(v) => write!(f, "{}", v),
            Scalar::Text(v) => write!(f, "{}", v),
            Scalar::Boolean(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Reason a leaf refused a value or a configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRejection {
    pub reason: String,
}

impl LeafRejection {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type LeafResult<T> = Result<T, LeafRejection>;

/// Capability shared by every scalar leaf.
pub trait Validate {
    /// Accepts or rejects a candidate value. `None` (undefined) is always accepted.
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()>;
}

/// Value, default and allow-list common to all scalar leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleState<T> {
    value: Option<T>,
    default: Option<T>,
    valid_values: Option<Vec<T>>,
}

impl<T> Default for SimpleState<T> {
    fn default() -> Self {
        Self {
            value: None,
            default: None,
            valid_values: None,
        }
    }
}

impl<T: Clone + PartialEq + fmt::Debug> SimpleState<T> {
    /// Current value, falling back to the default when unset.
    pub fn effective(&self) -> Option<&T> {
        self.value.as_ref().or(self.default.as_ref())
    }

    fn check_allowed(&self, candidate: &T) -> LeafResult<()> {
        match &self.valid_values {
            Some(valid) if !valid.contains(candidate) => Err(LeafRejection::new(format!(
                "{:?} is not one of {:?}",
                candidate, valid
            ))),
            _ => Ok(()),
        }
    }

    fn replace_value(&mut self, value: Option<T>) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    fn replace_default(&mut self, default: Option<T>) -> bool {
        if self.default == default {
            return false;
        }
        self.default = default;
        true
    }

    fn is_default(&self) -> bool {
        match &self.value {
            None => true,
            Some(v) => self.default.as_ref() == Some(v),
        }
    }

    fn is_undefined(&self) -> bool {
        self.value.is_none() && self.default.is_none()
    }
}

/// Numeric leaf with optional inclusive bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberLeaf {
    state: SimpleState<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberLeaf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    fn check_number(&self, v: f64) -> LeafResult<()> {
        if v.is_nan() {
            return Err(LeafRejection::new("NaN is not a number"));
        }
        self.state.check_allowed(&v)?;
        if let Some(min) = self.min {
            if v < min {
                return Err(LeafRejection::new(format!("{} is below minimum {}", v, min)));
            }
        }
        if let Some(max) = self.max {
            if v > max {
                return Err(LeafRejection::new(format!("{} is above maximum {}", v, max)));
            }
        }
        Ok(())
    }

    fn expect_number(candidate: Option<&Scalar>) -> LeafResult<Option<f64>> {
        match candidate {
            None => Ok(None),
            Some(Scalar::Number(v)) => Ok(Some(*v)),
            Some(other) => Err(LeafRejection::new(format!(
                "expected number, got {} '{}'",
                other.kind(),
                other
            ))),
        }
    }

    /// Lower bound. A bound above `max` drags `max` along; value and
    /// default below the bound are raised to it.
    pub fn set_min(&mut self, min: Option<f64>) -> bool {
        let before = self.clone();
        if let Some(m) = min {
            if self.max.is_some_and(|x| m > x) {
                self.max = Some(m);
            }
            if self.state.value.is_some_and(|v| v < m) {
                self.state.value = Some(m);
            }
            if self.state.default.is_some_and(|d| d < m) {
                self.state.default = Some(m);
            }
        }
        self.min = min;
        *self != before
    }

    /// Upper bound, symmetric to [`NumberLeaf::set_min`].
    pub fn set_max(&mut self, max: Option<f64>) -> bool {
        let before = self.clone();
        if let Some(m) = max {
            if self.min.is_some_and(|x| m < x) {
                self.min = Some(m);
            }
            if self.state.value.is_some_and(|v| v > m) {
                self.state.value = Some(m);
            }
            if self.state.default.is_some_and(|d| d > m) {
                self.state.default = Some(m);
            }
        }
        self.max = max;
        *self != before
    }
}

impl Validate for NumberLeaf {
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()> {
        match Self::expect_number(candidate)? {
            None => Ok(()),
            Some(v) => self.check_number(v),
        }
    }
}

/// Text leaf with an optional regular-expression validator.
#[derive(Debug, Clone, Default)]
pub struct TextLeaf {
    state: SimpleState<String>,
    pattern: Option<Regex>,
}

impl TextLeaf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(|re| re.as_str())
    }

    /// Installs a validator. Rejected if it does not compile or if the
    /// current value would fail it.
    pub fn set_pattern(&mut self, pattern: Option<&str>) -> LeafResult<bool> {
        let compiled = match pattern {
            None => None,
            Some(p) => Some(
                Regex::new(p).map_err(|e| LeafRejection::new(format!("bad pattern: {}", e)))?,
            ),
        };
        if let (Some(re), Some(current)) = (&compiled, &self.state.value) {
            if !re.is_match(current) {
                return Err(LeafRejection::new(format!(
                    "current value '{}' does not match /{}/",
                    current,
                    re.as_str()
                )));
            }
        }
        let changed = self.pattern() != pattern;
        self.pattern = compiled;
        Ok(changed)
    }

    fn expect_text(candidate: Option<&Scalar>) -> LeafResult<Option<String>> {
        match candidate {
            None => Ok(None),
            Some(Scalar::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Err(LeafRejection::new(format!(
                "expected string, got {} '{}'",
                other.kind(),
                other
            ))),
        }
    }
}

impl Validate for TextLeaf {
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()> {
        let Some(v) = Self::expect_text(candidate)? else {
            return Ok(());
        };
        self.state.check_allowed(&v)?;
        if let Some(re) = &self.pattern {
            if !re.is_match(&v) {
                return Err(LeafRejection::new(format!(
                    "'{}' does not match /{}/",
                    v,
                    re.as_str()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BooleanLeaf {
    state: SimpleState<bool>,
}

impl BooleanLeaf {
    pub fn new() -> Self {
        Self::default()
    }

    fn expect_bool(candidate: Option<&Scalar>) -> LeafResult<Option<bool>> {
        match candidate {
            None => Ok(None),
            Some(Scalar::Boolean(v)) => Ok(Some(*v)),
            Some(other) => Err(LeafRejection::new(format!(
                "expected boolean, got {} '{}'",
                other.kind(),
                other
            ))),
        }
    }
}

impl Validate for BooleanLeaf {
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()> {
        match Self::expect_bool(candidate)? {
            None => Ok(()),
            Some(v) => self.state.check_allowed(&v),
        }
    }
}

/// Boolean coercion: `"false"` and `0` are false, every other value is true.
pub fn coerce_bool(value: &Scalar) -> bool {
    match value {
        Scalar::Boolean(v) => *v,
        Scalar::Number(v) => *v != 0.0,
        Scalar::Text(v) => v != "false",
    }
}

/// Number with a fixed unit table and a selected display unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureLeaf {
    number: NumberLeaf,
    units: &'static [Unit],
    unit: usize,
}

impl MeasureLeaf {
    /// Fails when the table is empty; the caller reports it as a
    /// configuration error of the measure type.
    pub fn new(units: &'static [Unit]) -> LeafResult<Self> {
        if units.is_empty() {
            return Err(LeafRejection::new("measure declares no unit table"));
        }
        let mut leaf = Self {
            number: NumberLeaf::new(),
            units,
            unit: 0,
        };
        leaf.apply_unit_bounds();
        Ok(leaf)
    }

    pub fn number(&self) -> &NumberLeaf {
        &self.number
    }

    pub fn number_mut(&mut self) -> &mut NumberLeaf {
        &mut self.number
    }

    pub fn units(&self) -> &'static [Unit] {
        self.units
    }

    pub fn unit(&self) -> &Unit {
        &self.units[self.unit]
    }

    pub fn unit_index(&self) -> usize {
        self.unit
    }

    /// Selects a display unit by index. The stored number is untouched.
    pub fn select_unit_index(&mut self, index: usize) -> LeafResult<bool> {
        if index >= self.units.len() {
            return Err(LeafRejection::new(format!(
                "unit index {} out of range (0..{})",
                index,
                self.units.len()
            )));
        }
        if index == self.unit {
            return Ok(false);
        }
        self.unit = index;
        self.apply_unit_bounds();
        Ok(true)
    }

    /// Selects a display unit by id or abbreviation.
    pub fn select_unit(&mut self, key: &str) -> LeafResult<bool> {
        let index = find_unit(self.units, key).ok_or_else(|| {
            LeafRejection::new(format!(
                "unknown unit '{}', expected one of: {}",
                key,
                itertools::join(self.units.iter().map(|u| u.id), ", ")
            ))
        })?;
        self.select_unit_index(index)
    }

    fn apply_unit_bounds(&mut self) {
        let unit = self.units[self.unit];
        if unit.min.is_some() {
            self.number.set_min(unit.min);
        }
        if unit.max.is_some() {
            self.number.set_max(unit.max);
        }
        if self.number.state.default.is_none() {
            self.number.state.default = unit.default;
        }
    }
}

impl Validate for MeasureLeaf {
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()> {
        self.number.check_value(candidate)
    }
}

/// Closed set of scalar leaf variants.
#[derive(Debug, Clone)]
pub enum Leaf {
    Number(NumberLeaf),
    Text(TextLeaf),
    Boolean(BooleanLeaf),
    Measure(MeasureLeaf),
}

impl Validate for Leaf {
    fn check_value(&self, candidate: Option<&Scalar>) -> LeafResult<()> {
        match self {
            Leaf::Number(l) => l.check_value(candidate),
            Leaf::Text(l) => l.check_value(candidate),
            Leaf::Boolean(l) => l.check_value(candidate),
            Leaf::Measure(l) => l.check_value(candidate),
        }
    }
}

impl Leaf {
    /// Effective value: the assigned value, else the default.
    pub fn value(&self) -> Option<Scalar> {
        match self {
            Leaf::Number(l) => l.state.effective().map(|v| Scalar::Number(*v)),
            Leaf::Measure(l) => l.number.state.effective().map(|v| Scalar::Number(*v)),
            Leaf::Text(l) => l.state.effective().map(|v| Scalar::Text(v.clone())),
            Leaf::Boolean(l) => l.state.effective().map(|v| Scalar::Boolean(*v)),
        }
    }

    /// Explicitly assigned value, without the default fallback.
    pub fn raw_value(&self) -> Option<Scalar> {
        match self {
            Leaf::Number(l) => l.state.value.map(Scalar::Number),
            Leaf::Measure(l) => l.number.state.value.map(Scalar::Number),
            Leaf::Text(l) => l.state.value.clone().map(Scalar::Text),
            Leaf::Boolean(l) => l.state.value.map(Scalar::Boolean),
        }
    }

    pub fn default_value(&self) -> Option<Scalar> {
        match self {
            Leaf::Number(l) => l.state.default.map(Scalar::Number),
            Leaf::Measure(l) => l.number.state.default.map(Scalar::Number),
            Leaf::Text(l) => l.state.default.clone().map(Scalar::Text),
            Leaf::Boolean(l) => l.state.default.map(Scalar::Boolean),
        }
    }

    pub fn valid_values(&self) -> Option<Vec<Scalar>> {
        match self {
            Leaf::Number(l) => to_scalars(&l.state.valid_values),
            Leaf::Measure(l) => to_scalars(&l.number.state.valid_values),
            Leaf::Text(l) => to_scalars(&l.state.valid_values),
            Leaf::Boolean(l) => to_scalars(&l.state.valid_values),
        }
    }

    /// Assigns a value after `check_value`. Returns whether it changed.
    pub fn set_value(&mut self, candidate: Option<Scalar>) -> LeafResult<bool> {
        self.check_value(candidate.as_ref())?;
        let changed = match self {
            Leaf::Number(l) => l.state.replace_value(NumberLeaf::expect_number(candidate.as_ref())?),
            Leaf::Measure(l) => l
                .number
                .state
                .replace_value(NumberLeaf::expect_number(candidate.as_ref())?),
            Leaf::Text(l) => l.state.replace_value(TextLeaf::expect_text(candidate.as_ref())?),
            Leaf::Boolean(l) => l.state.replace_value(BooleanLeaf::expect_bool(candidate.as_ref())?),
        };
        Ok(changed)
    }

    /// Replaces the default; it must pass the same checks as a value.
    pub fn set_default(&mut self, candidate: Option<Scalar>) -> LeafResult<bool> {
        self.check_value(candidate.as_ref())?;
        let changed = match self {
            Leaf::Number(l) => l
                .state
                .replace_default(NumberLeaf::expect_number(candidate.as_ref())?),
            Leaf::Measure(l) => l
                .number
                .state
                .replace_default(NumberLeaf::expect_number(candidate.as_ref())?),
            Leaf::Text(l) => l.state.replace_default(TextLeaf::expect_text(candidate.as_ref())?),
            Leaf::Boolean(l) => l
                .state
                .replace_default(BooleanLeaf::expect_bool(candidate.as_ref())?),
        };
        Ok(changed)
    }

    /// Installs an allow-list. Rejected if the current value is not in it.
    pub fn set_valid_values(&mut self, valid: Option<Vec<Scalar>>) -> LeafResult<bool> {
        fn convert<T>(
            valid: &Option<Vec<Scalar>>,
            expect: fn(Option<&Scalar>) -> LeafResult<Option<T>>,
        ) -> LeafResult<Option<Vec<T>>> {
            match valid {
                None => Ok(None),
                Some(list) => list
                    .iter()
                    .map(|s| {
                        expect(Some(s)).and_then(|v| {
                            v.ok_or_else(|| LeafRejection::new("allow-list entry is undefined"))
                        })
                    })
                    .collect::<LeafResult<Vec<T>>>()
                    .map(Some),
            }
        }
        fn install<T: Clone + PartialEq + fmt::Debug>(
            state: &mut SimpleState<T>,
            valid: Option<Vec<T>>,
        ) -> LeafResult<bool> {
            if let (Some(list), Some(current)) = (&valid, &state.value) {
                if !list.contains(current) {
                    return Err(LeafRejection::new(format!(
                        "current value {:?} is not one of {:?}",
                        current, list
                    )));
                }
            }
            let changed = state.valid_values != valid;
            state.valid_values = valid;
            Ok(changed)
        }

        match self {
            Leaf::Number(l) => install(&mut l.state, convert(&valid, NumberLeaf::expect_number)?),
            Leaf::Measure(l) => install(
                &mut l.number.state,
                convert(&valid, NumberLeaf::expect_number)?,
            ),
            Leaf::Text(l) => install(&mut l.state, convert(&valid, TextLeaf::expect_text)?),
            Leaf::Boolean(l) => install(&mut l.state, convert(&valid, BooleanLeaf::expect_bool)?),
        }
    }

    /// Numeric part of number and measure leaves.
    pub fn numeric_mut(&mut self) -> LeafResult<&mut NumberLeaf> {
        match self {
            Leaf::Number(l) => Ok(l),
            Leaf::Measure(l) => Ok(&mut l.number),
            other => Err(LeafRejection::new(format!("{} leaf has no bounds", other.kind_name()))),
        }
    }

    pub fn numeric(&self) -> Option<&NumberLeaf> {
        match self {
            Leaf::Number(l) => Some(l),
            Leaf::Measure(l) => Some(&l.number),
            _ => None,
        }
    }

    pub fn measure_mut(&mut self) -> LeafResult<&mut MeasureLeaf> {
        match self {
            Leaf::Measure(l) => Ok(l),
            other => Err(LeafRejection::new(format!("{} leaf has no units", other.kind_name()))),
        }
    }

    pub fn measure(&self) -> Option<&MeasureLeaf> {
        match self {
            Leaf::Measure(l) => Some(l),
            _ => None,
        }
    }

    /// Unsets the value so the default applies again.
    pub fn reset(&mut self) -> bool {
        match self {
            Leaf::Number(l) => l.state.replace_value(None),
            Leaf::Measure(l) => l.number.state.replace_value(None),
            Leaf::Text(l) => l.state.replace_value(None),
            Leaf::Boolean(l) => l.state.replace_value(None),
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            Leaf::Number(l) => l.state.is_default(),
            Leaf::Measure(l) => l.number.state.is_default(),
            Leaf::Text(l) => l.state.is_default(),
            Leaf::Boolean(l) => l.state.is_default(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        match self {
            Leaf::Number(l) => l.state.is_undefined(),
            Leaf::Measure(l) => l.number.state.is_undefined(),
            Leaf::Text(l) => l.state.is_undefined(),
            Leaf::Boolean(l) => l.state.is_undefined(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Leaf::Number(_) => "number",
            Leaf::Measure(_) => "measure",
            Leaf::Text(_) => "string",
            Leaf::Boolean(_) => "boolean",
        }
    }
}

fn to_scalars<T: Clone + Into<Scalar>>(list: &Option<Vec<T>>) -> Option<Vec<Scalar>> {
    list.as_ref()
        .map(|values| values.iter().cloned().map(Into::into).collect())
}
