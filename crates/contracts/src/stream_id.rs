//! StreamId - logical source identifier
//!
//! Backed by `Arc<str>`: ids come from configuration once and are then
//! cloned into every sample, group and metric label.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of one logical stream, e.g. `"video-left"` or `"meta-left"`.
///
/// # Examples
/// ```
/// use contracts::StreamId;
///
/// let id: StreamId = "video-left".into();
/// let copy = id.clone();
/// assert_eq!(id, copy);
/// assert_eq!(copy.as_str(), "video-left");
/// ```
#[derive(Clone, Default)]
pub struct StreamId(Arc<str>);

impl StreamId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for StreamId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StreamId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets `HashMap<StreamId, _>` be queried with a plain `&str`.
impl Borrow<str> for StreamId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StreamId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for StreamId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({:?})", &*self.0)
    }
}

impl PartialEq for StreamId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for StreamId {}

impl PartialEq<str> for StreamId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for StreamId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl PartialOrd for StreamId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StreamId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

// Must agree with `str`'s hash for the `Borrow<str>` lookups above.
impl Hash for StreamId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for StreamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StreamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    #[test]
    fn test_clone_shares_storage() {
        let a: StreamId = "meta-left".into();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_lookup_by_str() {
        let mut offsets: HashMap<StreamId, f64> = HashMap::new();
        offsets.insert("video".into(), 0.01);
        offsets.insert("meta".into(), 0.0);
        assert_eq!(offsets.get("video"), Some(&0.01));
        assert!(offsets.get("audio").is_none());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let ids: BTreeSet<StreamId> = ["video-right", "meta-left", "video-left"]
            .into_iter()
            .map(StreamId::from)
            .collect();
        let ordered: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ordered, vec!["meta-left", "video-left", "video-right"]);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: StreamId = "meta-right".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"meta-right\"");
        let back: StreamId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, "meta-right");
    }
}
