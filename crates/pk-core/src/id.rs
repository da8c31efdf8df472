use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NAMES: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Next sequence number handed out by [`ObjectId::with_prefix`].
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identity of one object in a scene, stored as an interned name.
///
/// Generated ids look like `text_12`. Ids read back from a saved document
/// are kept as written; [`ObjectId::reserve`] moves the sequence past them
/// so a later object never takes a loaded object's name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Spur);

impl ObjectId {
    pub fn intern(name: &str) -> Self {
        ObjectId(NAMES.get_or_intern(name))
    }

    pub fn as_str(&self) -> &str {
        NAMES.resolve(&self.0)
    }

    /// Fresh `<prefix>_<n>` id.
    pub fn with_prefix(prefix: &str) -> Self {
        let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// Trailing `_<n>` of the name, if it has one.
    pub fn sequence(&self) -> Option<u64> {
        let (_, tail) = self.as_str().rsplit_once('_')?;
        tail.parse().ok()
    }

    /// Keep [`ObjectId::with_prefix`] from ever producing `id` again.
    pub fn reserve(id: ObjectId) {
        if let Some(n) = id.sequence() {
            SEQUENCE.fetch_max(n.saturating_add(1), Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ObjectId::intern(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        let a = ObjectId::intern("headline");
        assert_eq!(a, ObjectId::intern("headline"));
        assert_ne!(a, ObjectId::intern("subline"));
        assert_eq!(a.to_string(), "headline");
    }

    #[test]
    fn generated_ids_carry_prefix_and_sequence() {
        let a = ObjectId::with_prefix("text");
        let b = ObjectId::with_prefix("text");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("text_"));
        assert!(a.sequence().is_some());
    }

    #[test]
    fn sequence_needs_numeric_tail() {
        assert_eq!(ObjectId::intern("qr_41").sequence(), Some(41));
        assert_eq!(ObjectId::intern("my_logo").sequence(), None);
        assert_eq!(ObjectId::intern("logo").sequence(), None);
    }

    #[test]
    fn reserved_names_are_skipped() {
        let loaded = ObjectId::intern("shape_7000000");
        ObjectId::reserve(loaded);
        let next = ObjectId::with_prefix("shape");
        assert!(next.sequence().is_some_and(|n| n > 7_000_000));
        assert_ne!(next, loaded);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ObjectId::intern("qr_9");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"qr_9\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
