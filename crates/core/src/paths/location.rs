//! Location of a unit within a storage root.
//!
//! Every unit lives in its own directory directly under the storage root:
//!
//! ```text
//! <root>/
//! └── <escaped id>/
//!     ├── unit.json        # the encoded unit
//!     └── unit.json.tmp    # only while a save is in flight
//! ```
//!
//! Unit ids are free-form text, so they are escaped before being used as a directory name.
//! Bytes in `[A-Za-z0-9_-]` are kept, `.` is kept unless it is the first byte, and every other
//! byte is written as `%XX` (uppercase hex). Because `%` is always escaped the mapping is
//! injective, and because separators and a leading dot are always escaped an id can never
//! name `.`, `..` or a nested path.

use crate::constants::{UNIT_FILE_NAME, UNIT_STAGING_FILE_NAME};
use std::path::{Path, PathBuf};
use unitstore_types::UnitId;

/// Where a unit is stored: a storage root and the unit's id.
///
/// Locations are recomputed for every operation and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    root: PathBuf,
    id: UnitId,
}

impl Location {
    /// Resolves the location of `id` under `root`. Pure; performs no I/O.
    pub fn resolve(root: impl Into<PathBuf>, id: UnitId) -> Self {
        Self {
            root: root.into(),
            id,
        }
    }

    /// Location of another unit under the same root.
    pub fn sibling(&self, id: UnitId) -> Self {
        Self::resolve(self.root.clone(), id)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// `<root>/<escaped id>`
    pub fn dir(&self) -> PathBuf {
        self.root.join(escape_id_component(self.id.as_str()))
    }

    /// `<root>/<escaped id>/unit.json`
    pub fn file(&self) -> PathBuf {
        self.dir().join(UNIT_FILE_NAME)
    }

    /// `<root>/<escaped id>/unit.json.tmp`
    pub fn staging_file(&self) -> PathBuf {
        self.dir().join(UNIT_STAGING_FILE_NAME)
    }
}

fn is_kept(byte: u8, position: usize) -> bool {
    match byte {
        b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => true,
        b'.' => position > 0,
        _ => false,
    }
}

/// Turns a unit id into a single, safe path component.
pub fn escape_id_component(id: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(id.len());
    for (position, byte) in id.bytes().enumerate() {
        if is_kept(byte, position) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
    out
}

/// Length in bytes of [`escape_id_component`]'s output, without building it.
pub fn escaped_len(id: &str) -> usize {
    id.bytes()
        .enumerate()
        .map(|(position, byte)| if is_kept(byte, position) { 1 } else { 3 })
        .sum()
}

/// Inverse of [`escape_id_component`].
///
/// Returns `None` for names that [`escape_id_component`] could not have produced, such as
/// stray entries created by other tools.
pub fn unescape_id_component(component: &str) -> Option<String> {
    fn hex_value(byte: u8) -> Option<u8> {
        match byte {
            b'0'..=b'9' => Some(byte - b'0'),
            b'A'..=b'F' => Some(byte - b'A' + 10),
            _ => None,
        }
    }

    let bytes = component.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let position = out.len();
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            let decoded = (hi << 4) | lo;
            if is_kept(decoded, position) {
                return None;
            }
            out.push(decoded);
            i += 3;
        } else if is_kept(bytes[i], position) {
            out.push(bytes[i]);
            i += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> UnitId {
        UnitId::new(s).unwrap()
    }

    #[test]
    fn test_plain_ids_are_unchanged() {
        assert_eq!(escape_id_component("note-1_a.b"), "note-1_a.b");
        let location = Location::resolve("/store", id("abc"));
        assert_eq!(location.dir(), PathBuf::from("/store/abc"));
        assert_eq!(location.file(), PathBuf::from("/store/abc/unit.json"));
        assert_eq!(
            location.staging_file(),
            PathBuf::from("/store/abc/unit.json.tmp")
        );
    }

    #[test]
    fn test_separators_and_dots_cannot_escape_the_root() {
        assert_eq!(escape_id_component("a/b"), "a%2Fb");
        assert_eq!(escape_id_component("a\\b"), "a%5Cb");
        assert_eq!(escape_id_component(".."), "%2E.");
        assert_eq!(escape_id_component(".hidden"), "%2Ehidden");

        let location = Location::resolve("/store", id("../../etc/passwd"));
        assert_eq!(location.dir().parent(), Some(Path::new("/store")));
    }

    #[test]
    fn test_escaping_is_injective_for_percent() {
        assert_ne!(escape_id_component("a/b"), escape_id_component("a%2Fb"));
        assert_eq!(escape_id_component("a%2Fb"), "a%252Fb");
    }

    #[test]
    fn test_escaped_len_matches_escape() {
        let long = "é".repeat(50);
        for raw in ["plain", "a/b", ".x", "é", "100%", long.as_str()] {
            assert_eq!(escaped_len(raw), escape_id_component(raw).len(), "{raw}");
        }
    }

    #[test]
    fn test_non_ascii_is_escaped_per_byte() {
        assert_eq!(escape_id_component("é"), "%C3%A9");
        assert_eq!(unescape_id_component("%C3%A9").as_deref(), Some("é"));
    }

    #[test]
    fn test_unescape_inverts_escape() {
        for raw in ["a/b", "..", ".x", "100%", "with space", "plain", "a.b.c"] {
            let escaped = escape_id_component(raw);
            assert_eq!(unescape_id_component(&escaped).as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_unescape_rejects_foreign_names() {
        assert_eq!(unescape_id_component(".tmp"), None);
        assert_eq!(unescape_id_component("a b"), None);
        assert_eq!(unescape_id_component("%zz"), None);
        assert_eq!(unescape_id_component("%41"), None);
        assert_eq!(unescape_id_component("%4"), None);
    }

    #[test]
    fn test_locations_compare_by_root_and_id() {
        let a = Location::resolve("/one", id("x"));
        assert_eq!(a, Location::resolve("/one", id("x")));
        assert_ne!(a, Location::resolve("/two", id("x")));
        assert_ne!(a, Location::resolve("/one", id("y")));
        assert_eq!(a.sibling(id("y")), Location::resolve("/one", id("y")));
    }
}
