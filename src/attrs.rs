use num_traits::NumCast;
use serde::{Deserialize, Serialize};

use crate::types::Shape;

/// A typed attribute payload. Operators extract what they need; a lookup
/// that finds the wrong variant behaves like an absent attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(usize),
    IntTuple(Vec<usize>),
    Shape(Shape),
    Scalar(f64),
}

impl AttrValue {
    pub fn to_int(&self) -> Option<usize> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_tuple(&self) -> Option<&[usize]> {
        match self {
            AttrValue::IntTuple(v) => Some(v),
            _ => None,
        }
    }

    /// Fixed-length extraction, e.g. `to_static::<2>()` for the 2-D kernel
    /// and stride attributes.
    pub fn to_static<const N: usize>(&self) -> Option<[usize; N]> {
        match self {
            AttrValue::IntTuple(v) if v.len() == N => {
                let mut out = [0usize; N];
                out.copy_from_slice(v);
                Some(out)
            }
            _ => None,
        }
    }

    pub fn to_shape(&self) -> Option<&Shape> {
        match self {
            AttrValue::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_scalar<T: NumCast>(&self) -> Option<T> {
        match self {
            AttrValue::Scalar(v) => T::from(*v),
            AttrValue::Int(v) => T::from(*v),
            _ => None,
        }
    }
}

/// Ordered name/value pairs attached to a node. Keys are literal strings
/// fixed at graph-build time; lookup returns the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, AttrValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: AttrValue) -> Self {
        self.0.push((name.to_string(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(n, _)| n.as_str() == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
