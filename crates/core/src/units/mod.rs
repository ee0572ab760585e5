//! Built-in unit types.
//!
//! - [`Note`]: a titled block of text
//! - [`Todo`]: a titled checklist
//! - [`List`]: a titled container of other units, each stored as a unit of its own

mod list;
mod note;
mod todo;

pub use list::List;
pub use note::Note;
pub use todo::{Todo, TodoItem};
