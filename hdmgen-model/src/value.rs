//! Member values of the reference graph.

use hdmgen_core::ObjRef;
use hdmgen_schema::{Cardinality, Member, ScalarKind};
use std::cmp::Ordering;

/// Value stored in one member slot of an object.
///
/// Integers are widened to 64 bits; setters check that the value fits the
/// declared width. Collections distinguish "never created" (`Refs(None)`)
/// from "created but empty", the way the archive does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// Text, value and delay content.
    Text(String),
    Ref(Option<ObjRef>),
    Refs(Option<Vec<ObjRef>>),
}

impl Value {
    /// Default value of a freshly created object's slot for `member`.
    #[must_use]
    pub fn default_for(member: &Member) -> Self {
        match member.scalar_kind() {
            Some(ScalarKind::Bool) => Self::Bool(false),
            Some(ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64) => Self::Int(0),
            Some(ScalarKind::UInt16 | ScalarKind::UInt32 | ScalarKind::UInt64) => Self::UInt(0),
            Some(ScalarKind::String | ScalarKind::Value | ScalarKind::Delay) => {
                Self::Text(String::new())
            }
            None => match member.cardinality {
                Cardinality::One => Self::Ref(None),
                Cardinality::Many => Self::Refs(None),
            },
        }
    }

    /// Checks that `self` may be stored in a slot declared as `member`.
    ///
    /// Returns a human-readable reason on failure. Reference compliance with
    /// the member's target is checked by the graph, which knows the schema.
    pub fn check_fits(&self, member: &Member) -> Result<(), String> {
        let fits = match (member.scalar_kind(), self) {
            (Some(ScalarKind::Bool), Self::Bool(_)) => true,
            (Some(ScalarKind::Int16), Self::Int(v)) => i16::try_from(*v).is_ok(),
            (Some(ScalarKind::Int32), Self::Int(v)) => i32::try_from(*v).is_ok(),
            (Some(ScalarKind::Int64), Self::Int(_)) => true,
            (Some(ScalarKind::UInt16), Self::UInt(v)) => u16::try_from(*v).is_ok(),
            (Some(ScalarKind::UInt32), Self::UInt(v)) => u32::try_from(*v).is_ok(),
            (Some(ScalarKind::UInt64), Self::UInt(_)) => true,
            (Some(ScalarKind::String | ScalarKind::Value | ScalarKind::Delay), Self::Text(_)) => {
                true
            }
            (None, Self::Ref(_)) => member.cardinality == Cardinality::One,
            (None, Self::Refs(_)) => member.cardinality == Cardinality::Many,
            _ => false,
        };
        if fits {
            Ok(())
        } else {
            Err(format!("{} does not fit {}", self.kind_name(), describe(member)))
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::Text(_) => "text",
            Self::Ref(_) => "reference",
            Self::Refs(_) => "reference list",
        }
    }

    /// Referenced objects, in order.
    #[must_use]
    pub fn references(&self) -> &[ObjRef] {
        match self {
            Self::Ref(Some(obj)) => std::slice::from_ref(obj),
            Self::Refs(Some(items)) => items,
            _ => &[],
        }
    }

    /// Orders two scalar values of the same kind.
    ///
    /// Reference values compare equal here; the comparison walk recurses
    /// into them separately.
    #[must_use]
    pub fn scalar_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::UInt(a), Self::UInt(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Ref(_) | Self::Refs(_), Self::Ref(_) | Self::Refs(_)) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::UInt(_) => 2,
            Self::Text(_) => 3,
            Self::Ref(_) => 4,
            Self::Refs(_) => 5,
        }
    }
}

fn describe(member: &Member) -> String {
    match member.scalar_kind() {
        Some(kind) => kind.to_string(),
        None if member.is_many() => "reference list".to_string(),
        None => "reference".to_string(),
    }
}
