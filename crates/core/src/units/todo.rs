use crate::unit::{EncodingHeader, Unit, UnitCodecError, UnitType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use unitstore_types::UnitId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    pub done: bool,
}

/// A titled checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id: UnitId,
    title: String,
    items: Vec<TodoItem>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct TodoRecord {
    id: UnitId,
    #[serde(rename = "type")]
    unit_type: String,
    title: String,
    items: Vec<TodoItem>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl Todo {
    pub fn new(id: UnitId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            items: Vec::new(),
            created: now,
            updated: now,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn add_item(&mut self, text: impl Into<String>) {
        self.items.push(TodoItem {
            text: text.into(),
            done: false,
        });
        self.updated = Utc::now();
    }

    /// Marks the item at `index`; returns false if there is no such item.
    pub fn set_done(&mut self, index: usize, done: bool) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.done = done;
                self.updated = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.done).count()
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }
}

impl Unit for Todo {
    fn id(&self) -> &UnitId {
        &self.id
    }

    fn unit_type(&self) -> &str {
        Self::TYPE
    }

    fn encode(&self) -> Result<Vec<u8>, UnitCodecError> {
        let record = TodoRecord {
            id: self.id.clone(),
            unit_type: Self::TYPE.to_string(),
            title: self.title.clone(),
            items: self.items.clone(),
            created: self.created,
            updated: self.updated,
        };
        Ok(serde_json::to_vec_pretty(&record)?)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), UnitCodecError> {
        EncodingHeader::check(bytes, Self::TYPE, &self.id)?;
        let record: TodoRecord = serde_json::from_slice(bytes)?;
        self.title = record.title;
        self.items = record.items;
        self.created = record.created;
        self.updated = record.updated;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl UnitType for Todo {
    const TYPE: &'static str = "todo";

    fn blank(id: UnitId) -> Self {
        Self {
            id,
            title: String::new(),
            items: Vec::new(),
            created: DateTime::<Utc>::default(),
            updated: DateTime::<Utc>::default(),
        }
    }
}
