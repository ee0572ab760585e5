use crate::unit::{EncodingHeader, Unit, UnitCodecError, UnitType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use unitstore_types::UnitId;

/// A titled block of free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    id: UnitId,
    title: String,
    body: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct NoteRecord {
    id: UnitId,
    #[serde(rename = "type")]
    unit_type: String,
    title: String,
    body: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl Note {
    pub fn new(id: UnitId, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            body: body.into(),
            created: now,
            updated: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated = Utc::now();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.updated = Utc::now();
    }
}

impl Unit for Note {
    fn id(&self) -> &UnitId {
        &self.id
    }

    fn unit_type(&self) -> &str {
        Self::TYPE
    }

    fn encode(&self) -> Result<Vec<u8>, UnitCodecError> {
        let record = NoteRecord {
            id: self.id.clone(),
            unit_type: Self::TYPE.to_string(),
            title: self.title.clone(),
            body: self.body.clone(),
            created: self.created,
            updated: self.updated,
        };
        Ok(serde_json::to_vec_pretty(&record)?)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), UnitCodecError> {
        EncodingHeader::check(bytes, Self::TYPE, &self.id)?;
        let record: NoteRecord = serde_json::from_slice(bytes)?;
        self.title = record.title;
        self.body = record.body;
        self.created = record.created;
        self.updated = record.updated;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl UnitType for Note {
    const TYPE: &'static str = "note";

    fn blank(id: UnitId) -> Self {
        Self {
            id,
            title: String::new(),
            body: String::new(),
            created: DateTime::<Utc>::default(),
            updated: DateTime::<Utc>::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_carries_header_fields() {
        let note = Note::new(UnitId::new("n1").unwrap(), "Title", "Body");
        let value: serde_json::Value = serde_json::from_slice(&note.encode().unwrap()).unwrap();

        assert_eq!(value["id"], "n1");
        assert_eq!(value["type"], "note");
        assert_eq!(value["title"], "Title");
        assert_eq!(value["body"], "Body");
    }

    #[test]
    fn test_decode_restores_all_fields() {
        let note = Note::new(UnitId::new("n1").unwrap(), "Title", "Body");
        let mut restored = Note::blank(UnitId::new("n1").unwrap());
        restored.decode(&note.encode().unwrap()).unwrap();
        assert_eq!(restored, note);
    }

    #[test]
    fn test_decode_rejects_other_types() {
        let mut note = Note::blank(UnitId::new("n1").unwrap());
        let err = note
            .decode(br#"{"id":"n1","type":"todo","title":"","items":[]}"#)
            .unwrap_err();
        assert!(matches!(err, UnitCodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let mut note = Note::blank(UnitId::new("n1").unwrap());
        assert!(matches!(
            note.decode(br#"{"id":"n1","type":"note"}"#),
            Err(UnitCodecError::Json(_))
        ));
    }

    #[test]
    fn test_setters_bump_updated() {
        let mut note = Note::new(UnitId::new("n1").unwrap(), "a", "b");
        let before = note.updated();
        note.set_body("changed");
        assert_eq!(note.body(), "changed");
        assert!(note.updated() >= before);
        assert_eq!(note.created(), before);
    }

    #[test]
    fn test_notes_have_no_children() {
        let mut note = Note::new(UnitId::new("n1").unwrap(), "a", "b");
        assert!(note.children().is_empty());
        assert!(note.child_ids().is_empty());
        let child = Note::new(UnitId::new("n2").unwrap(), "c", "d");
        assert!(matches!(
            note.attach_child(Box::new(child)),
            Err(UnitCodecError::ChildrenNotSupported(_))
        ));
    }
}
