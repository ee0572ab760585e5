use crate::unit::{EncodingHeader, Unit, UnitCodecError, UnitType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use unitstore_types::UnitId;

/// A titled, ordered container of other units.
///
/// The encoding of a list stores only the ids of its items. Each item is persisted as a unit
/// of its own and attached back in order when the list is loaded.
#[derive(Debug)]
pub struct List {
    id: UnitId,
    title: String,
    items: Vec<Box<dyn Unit>>,
    /// Item ids in order. Matches `items` for lists built in memory; after a decode it holds
    /// the ids still waiting for [`Unit::attach_child`].
    declared: Vec<UnitId>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct ListRecord {
    id: UnitId,
    #[serde(rename = "type")]
    unit_type: String,
    title: String,
    items: Vec<UnitId>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl List {
    pub fn new(id: UnitId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            items: Vec::new(),
            declared: Vec::new(),
            created: now,
            updated: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn push(&mut self, item: Box<dyn Unit>) {
        self.declared.push(item.id().clone());
        self.items.push(item);
        self.updated = Utc::now();
    }

    pub fn items(&self) -> &[Box<dyn Unit>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Unit for List {
    fn id(&self) -> &UnitId {
        &self.id
    }

    fn unit_type(&self) -> &str {
        Self::TYPE
    }

    fn encode(&self) -> Result<Vec<u8>, UnitCodecError> {
        let record = ListRecord {
            id: self.id.clone(),
            unit_type: Self::TYPE.to_string(),
            title: self.title.clone(),
            items: self.declared.clone(),
            created: self.created,
            updated: self.updated,
        };
        Ok(serde_json::to_vec_pretty(&record)?)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), UnitCodecError> {
        EncodingHeader::check(bytes, Self::TYPE, &self.id)?;
        let record: ListRecord = serde_json::from_slice(bytes)?;
        self.title = record.title;
        self.items.clear();
        self.declared = record.items;
        self.created = record.created;
        self.updated = record.updated;
        Ok(())
    }

    fn children(&self) -> Vec<&dyn Unit> {
        self.items.iter().map(|item| item.as_ref()).collect()
    }

    fn child_ids(&self) -> Vec<UnitId> {
        self.declared.clone()
    }

    fn attach_child(&mut self, child: Box<dyn Unit>) -> Result<(), UnitCodecError> {
        // Children must arrive in declaration order.
        match self.declared.get(self.items.len()) {
            Some(expected) if expected == child.id() => {
                self.items.push(child);
                Ok(())
            }
            _ => Err(UnitCodecError::UndeclaredChild {
                child: child.id().clone(),
            }),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl UnitType for List {
    const TYPE: &'static str = "list";

    fn blank(id: UnitId) -> Self {
        Self {
            id,
            title: String::new(),
            items: Vec::new(),
            declared: Vec::new(),
            created: DateTime::<Utc>::default(),
            updated: DateTime::<Utc>::default(),
        }
    }
}
