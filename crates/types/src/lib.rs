//! Validated text types shared across the unitstore crates.
//!
//! Values of these types are checked once at construction, so code holding a [`UnitId`] or a
//! [`NonEmptyText`] never has to re-validate them.

/// Maximum length of a unit identifier, in bytes.
pub const MAX_UNIT_ID_LEN: usize = 255;

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input text exceeded the allowed length
    #[error("Text is {len} bytes long, maximum is {max}")]
    TooLong { len: usize, max: usize },

    /// The input text contained an ASCII control character
    #[error("Text contains a control character at byte {0}")]
    ControlCharacter(usize),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a unit within a storage root.
///
/// A `UnitId` is trimmed, non-empty, at most [`MAX_UNIT_ID_LEN`] bytes and free of ASCII
/// control characters. It may still contain path separators or dots; turning it into a
/// filesystem name is the storage layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(NonEmptyText);

impl UnitId {
    /// Validates and wraps an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TextError`] if the input is empty, too long, or contains a control character.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        let len = text.as_str().len();
        if len > MAX_UNIT_ID_LEN {
            return Err(TextError::TooLong {
                len,
                max: MAX_UNIT_ID_LEN,
            });
        }
        if let Some(pos) = text.as_str().bytes().position(|b| b.is_ascii_control()) {
            return Err(TextError::ControlCharacter(pos));
        }
        Ok(Self(text))
    }

    /// Allocates a fresh identifier: a v4 UUID in 32-character lowercase simple form.
    pub fn generate() -> Self {
        Self(NonEmptyText(uuid::Uuid::new_v4().simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for UnitId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitId::new(s)
    }
}

impl serde::Serialize for UnitId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for UnitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UnitId::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  hello  ").unwrap();
        assert_eq!(text.as_str(), "hello");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn test_unit_id_accepts_separators() {
        let id = UnitId::new("notes/2024").expect("separators are allowed in ids");
        assert_eq!(id.as_str(), "notes/2024");
    }

    #[test]
    fn test_unit_id_rejects_control_characters() {
        assert_eq!(
            UnitId::new("a\0b").unwrap_err(),
            TextError::ControlCharacter(1)
        );
        assert!(UnitId::new("line\nbreak").is_err());
    }

    #[test]
    fn test_unit_id_rejects_overlong_input() {
        let long = "x".repeat(MAX_UNIT_ID_LEN + 1);
        assert!(matches!(
            UnitId::new(long),
            Err(TextError::TooLong { len: 256, max: 255 })
        ));
        assert!(UnitId::new("x".repeat(MAX_UNIT_ID_LEN)).is_ok());
    }

    #[test]
    fn test_generated_ids_are_simple_uuids() {
        let a = UnitId::generate();
        let b = UnitId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a
            .as_str()
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_unit_id_serde_rejects_empty_string() {
        let id: UnitId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert!(serde_json::from_str::<UnitId>("\"  \"").is_err());
    }
}
