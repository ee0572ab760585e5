//! The unit capability.
//!
//! A unit is a domain object the storage layer persists without knowing its concrete type.
//! Each unit encodes itself to bytes and populates itself from bytes; the storage layer only
//! reads the `type` field of an encoding to decide which concrete type to construct.
//!
//! ## Encoding contract
//!
//! An encoding is a JSON object that carries at least:
//!
//! ```json
//! { "id": "<unit id>", "type": "<type tag>" }
//! ```
//!
//! Units that contain other units list the ids of their children in their own encoding and
//! report them through [`Unit::child_ids`]. Children are stored as units in their own right
//! and attached back to the parent with [`Unit::attach_child`] on load.

use serde::Deserialize;
use std::any::Any;
use unitstore_types::UnitId;

/// Errors raised by a unit while encoding or decoding itself.
#[derive(Debug, thiserror::Error)]
pub enum UnitCodecError {
    #[error("malformed unit encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected unit type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },
    #[error("encoding belongs to unit '{found}', expected '{expected}'")]
    IdMismatch { expected: UnitId, found: UnitId },
    #[error("unit type '{0}' does not accept child units")]
    ChildrenNotSupported(String),
    #[error("child unit '{child}' was not declared by its parent")]
    UndeclaredChild { child: UnitId },
    #[error("{0}")]
    Custom(String),
}

/// A persistable domain object.
pub trait Unit: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &UnitId;

    /// Discriminator written to the `type` field of the encoding.
    fn unit_type(&self) -> &str;

    fn encode(&self) -> Result<Vec<u8>, UnitCodecError>;

    /// Populates `self` from an encoding, replacing any previous state (children included).
    fn decode(&mut self, bytes: &[u8]) -> Result<(), UnitCodecError>;

    /// Child units currently held in memory.
    fn children(&self) -> Vec<&dyn Unit> {
        Vec::new()
    }

    /// Ids of the children declared by the last decoded encoding.
    ///
    /// The default reports the ids of [`Unit::children`].
    fn child_ids(&self) -> Vec<UnitId> {
        self.children().iter().map(|c| c.id().clone()).collect()
    }

    /// Attaches a child loaded from storage.
    fn attach_child(&mut self, _child: Box<dyn Unit>) -> Result<(), UnitCodecError> {
        Err(UnitCodecError::ChildrenNotSupported(
            self.unit_type().to_string(),
        ))
    }

    fn as_any(&self) -> &dyn Any;
}

/// A concrete unit type that can be registered for decoding.
pub trait UnitType: Unit + Sized + 'static {
    /// Type tag, identical to what [`Unit::unit_type`] returns.
    const TYPE: &'static str;

    /// An empty unit with the given id, ready to be populated by [`Unit::decode`].
    fn blank(id: UnitId) -> Self;
}

/// Reads only the discriminator of an encoding.
pub(crate) fn probe_type(bytes: &[u8]) -> Result<String, UnitCodecError> {
    #[derive(Deserialize)]
    struct TypeProbe {
        #[serde(rename = "type")]
        unit_type: String,
    }

    let probe: TypeProbe = serde_json::from_slice(bytes)?;
    Ok(probe.unit_type)
}

/// Header fields every encoding carries. Used by unit implementations to validate input.
#[derive(Debug, Deserialize)]
pub(crate) struct EncodingHeader {
    pub id: UnitId,
    #[serde(rename = "type")]
    pub unit_type: String,
}

impl EncodingHeader {
    /// Checks that an encoding is for the expected type and id.
    pub(crate) fn check(
        bytes: &[u8],
        expected_type: &str,
        expected_id: &UnitId,
    ) -> Result<(), UnitCodecError> {
        let header: EncodingHeader = serde_json::from_slice(bytes)?;
        if header.unit_type != expected_type {
            return Err(UnitCodecError::TypeMismatch {
                expected: expected_type.to_string(),
                found: header.unit_type,
            });
        }
        if &header.id != expected_id {
            return Err(UnitCodecError::IdMismatch {
                expected: expected_id.clone(),
                found: header.id,
            });
        }
        Ok(())
    }
}

/// Structural equality across unit trees: same type, same encoding, equal children.
///
/// Encoding failures compare as unequal.
pub fn units_equal(a: &dyn Unit, b: &dyn Unit) -> bool {
    if a.unit_type() != b.unit_type() || a.id() != b.id() {
        return false;
    }
    match (a.encode(), b.encode()) {
        (Ok(left), Ok(right)) if left == right => {}
        _ => return false,
    }
    let (left, right) = (a.children(), b.children());
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(l, r)| units_equal(*l, *r))
}
