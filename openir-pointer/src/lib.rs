use std::{
    any::Any,
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    fmt::{Debug, Display},
    ops::{Deref, Range},
};

use itertools::Itertools;

/// A parsed JSON Pointer.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JsonPointer<'a>(Cow<'a, [JsonPointerSegment<'a>]>);

impl JsonPointer<'static> {
    /// Constructs a pointer from an RFC 6901 string,
    /// with segments that own their contents.
    pub fn parse_owned(s: &str) -> Result<Self, BadJsonPointerSyntax> {
        JsonPointer::parse(s).map(JsonPointer::into_owned)
    }
}

impl<'a> JsonPointer<'a> {
    /// Constructs an empty pointer that resolves to the current value.
    pub fn empty() -> Self {
        Self(Cow::Borrowed(&[]))
    }

    /// Constructs a pointer from an RFC 6901 string,
    /// with segments that borrow from the string where possible.
    pub fn parse(s: &'a str) -> Result<Self, BadJsonPointerSyntax> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let Some(s) = s.strip_prefix('/') else {
            return Err(BadJsonPointerSyntax::MissingLeadingSlash);
        };
        let segments = s.split('/').map(JsonPointerSegment::unescape).collect_vec();
        Ok(Self(segments.into()))
    }

    /// Constructs a pointer from the URI fragment representation
    /// of RFC 6901, section 6: the part after the `#`, where each
    /// segment may also be percent-encoded.
    pub fn parse_fragment(s: &'a str) -> Result<Self, BadJsonPointerSyntax> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let Some(s) = s.strip_prefix('/') else {
            return Err(BadJsonPointerSyntax::MissingLeadingSlash);
        };
        let segments = s
            .split('/')
            .map(|segment| {
                // Decode before unescaping: `%7E1` becomes `~1`, then `/`.
                percent_encoding::percent_decode_str(segment)
                    .decode_utf8()
                    .map(JsonPointerSegment::unescape)
                    .map_err(|_| BadJsonPointerSyntax::InvalidUtf8(segment.to_owned()))
            })
            .try_collect()?;
        Ok(Self(Cow::Owned(segments)))
    }

    /// Returns `true` if this is an empty pointer.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of segments in this pointer.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first segment of this pointer, or `None`
    /// if this is an empty pointer.
    pub fn head(&self) -> Option<&JsonPointerSegment<'a>> {
        self.0.first()
    }

    /// Returns the last segment of this pointer, or `None`
    /// if this is an empty pointer.
    pub fn last(&self) -> Option<&JsonPointerSegment<'a>> {
        self.0.last()
    }

    /// Returns a new pointer without the first segment of this pointer.
    pub fn tail(&self) -> JsonPointer<'_> {
        self.0
            .get(1..)
            .map(|tail| JsonPointer(tail.into()))
            .unwrap_or_else(JsonPointer::empty)
    }

    /// Returns a borrowing iterator over this pointer's segments.
    pub fn segments(&self) -> std::slice::Iter<'_, JsonPointerSegment<'a>> {
        self.0.iter()
    }

    /// Converts this pointer into one that owns all its segments.
    pub fn into_owned(self) -> JsonPointer<'static> {
        let segments = self
            .0
            .iter()
            .map(|segment| JsonPointerSegment(Cow::Owned(segment.0.clone().into_owned())))
            .collect_vec();
        JsonPointer(Cow::Owned(segments))
    }
}

impl Display for JsonPointer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0 {
            [] => Ok(()),
            segments => write!(f, "/{}", segments.iter().format("/")),
        }
    }
}

/// A single, unescaped segment of a [`JsonPointer`].
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JsonPointerSegment<'a>(Cow<'a, str>);

impl<'a> JsonPointerSegment<'a> {
    /// Constructs a segment from its escaped form, replacing `~1` with `/`
    /// and `~0` with `~`, in that order.
    pub fn unescape(s: impl Into<Cow<'a, str>>) -> Self {
        let s = s.into();
        if s.contains('~') {
            Self(s.replace("~1", "/").replace("~0", "~").into())
        } else {
            Self(s)
        }
    }

    /// Constructs a segment from an already-unescaped string.
    pub fn new(s: impl Into<Cow<'a, str>>) -> Self {
        Self(s.into())
    }

    /// Returns the unescaped string value of this segment.
    #[inline]
    pub fn as_str(&self) -> &str {
        self
    }

    /// Returns the value of this segment as an array index,
    /// or `None` if this segment can't be used as an index.
    #[inline]
    pub fn to_index(&self) -> Option<usize> {
        match self.as_bytes() {
            [b'0'] => Some(0),
            // RFC 6901 forbids leading zeros and signs, which
            // `usize::from_str` would otherwise accept.
            [b'1'..=b'9', rest @ ..] if rest.iter().all(u8::is_ascii_digit) => self.parse().ok(),
            _ => None,
        }
    }
}

impl Deref for JsonPointerSegment<'_> {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for JsonPointerSegment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.replace('~', "~0").replace('/', "~1"))
    }
}

/// A value that a [`JsonPointer`] can traverse.
pub trait JsonPointee: Any {
    /// Resolves a [`JsonPointer`] against this value.
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer>;
}

impl dyn JsonPointee {
    /// Returns a reference to the pointed-to value if it's of type `T`,
    /// or `None` if it isn't.
    #[inline]
    pub fn downcast_ref<T: JsonPointee>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Returns `true` if the pointed-to value is of type `T`.
    #[inline]
    pub fn is<T: JsonPointee>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }
}

macro_rules! impl_leaf_pointee {
    ($($ty:ty),* $(,)?) => {
        $(
            impl JsonPointee for $ty {
                fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
                    if pointer.is_empty() {
                        Ok(self)
                    } else {
                        Err(BadJsonPointerTy::new(&pointer, stringify!($ty)).into())
                    }
                }
            }
        )*
    };
}

impl_leaf_pointee!(i32, i64, u32, u64, usize, f64, bool, String);

impl<T: JsonPointee> JsonPointee for Option<T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        match self {
            Some(value) => value.resolve(pointer),
            None => match pointer.head() {
                Some(key) => Err(BadJsonPointerKey::new(key).into()),
                None => Ok(self),
            },
        }
    }
}

impl<T: JsonPointee> JsonPointee for Box<T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        (**self).resolve(pointer)
    }
}

impl<T: JsonPointee> JsonPointee for Vec<T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        let Some(key) = pointer.head() else {
            return Ok(self);
        };
        let Some(index) = key.to_index() else {
            return Err(BadJsonPointerTy::new(&pointer, "array").into());
        };
        match self.get(index) {
            Some(item) => item.resolve(pointer.tail()),
            None => Err(BadJsonPointer::Index(index, 0..self.len())),
        }
    }
}

/// Resolves the rest of a pointer against the value that's stored
/// under its first segment in a string-keyed map.
fn resolve_entry<'v, T: JsonPointee>(
    pointer: &JsonPointer<'_>,
    lookup: impl FnOnce(&str) -> Option<&'v T>,
    keys: impl IntoIterator<Item = &'v str>,
) -> Result<&'v dyn JsonPointee, BadJsonPointer> {
    let key = match pointer.head() {
        Some(key) => key,
        None => return Err(BadJsonPointerTy::new(pointer, "map").into()),
    };
    match lookup(key.as_str()) {
        Some(value) => value.resolve(pointer.tail()),
        None => Err(BadJsonPointerKey::with_suggestions(key, keys).into()),
    }
}

impl<T: JsonPointee> JsonPointee for BTreeMap<String, T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        if pointer.is_empty() {
            return Ok(self);
        }
        resolve_entry(&pointer, |key| self.get(key), self.keys().map(String::as_str))
    }
}

impl<T: JsonPointee> JsonPointee for HashMap<String, T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        if pointer.is_empty() {
            return Ok(self);
        }
        resolve_entry(&pointer, |key| self.get(key), self.keys().map(String::as_str))
    }
}

#[cfg(feature = "indexmap")]
impl<T: JsonPointee> JsonPointee for indexmap::IndexMap<String, T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        if pointer.is_empty() {
            return Ok(self);
        }
        resolve_entry(&pointer, |key| self.get(key), self.keys().map(String::as_str))
    }
}

#[cfg(feature = "serde_json")]
impl JsonPointee for serde_json::Value {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        if pointer.is_empty() {
            return Ok(self);
        }
        match self {
            serde_json::Value::Object(map) => {
                resolve_entry(&pointer, |key| map.get(key), map.keys().map(String::as_str))
            }
            serde_json::Value::Array(array) => {
                let Some(index) = pointer.head().and_then(|key| key.to_index()) else {
                    return Err(BadJsonPointerTy::new(&pointer, "array").into());
                };
                match array.get(index) {
                    Some(item) => item.resolve(pointer.tail()),
                    None => Err(BadJsonPointer::Index(index, 0..array.len())),
                }
            }
            _ => Err(BadJsonPointerTy::new(&pointer, "scalar").into()),
        }
    }
}

/// An error that occurs while parsing a pointer.
#[derive(Debug, thiserror::Error)]
pub enum BadJsonPointerSyntax {
    #[error("JSON Pointer must start with `/`")]
    MissingLeadingSlash,
    #[error("JSON Pointer segment `{0}` isn't valid percent-encoded UTF-8")]
    InvalidUtf8(String),
}

/// An error that occurs during traversal.
#[derive(Debug, thiserror::Error)]
pub enum BadJsonPointer {
    #[error(transparent)]
    Key(#[from] BadJsonPointerKey),
    #[error("index {} out of range {}..{}", .0, .1.start, .1.end)]
    Index(usize, Range<usize>),
    #[error(transparent)]
    Ty(#[from] BadJsonPointerTy),
}

/// An error that occurs when a pointed-to value doesn't have a key
/// that the pointer references.
#[derive(Debug)]
pub struct BadJsonPointerKey {
    pub key: String,
    pub suggestion: Option<String>,
}

impl BadJsonPointerKey {
    #[cold]
    pub fn new(key: &JsonPointerSegment<'_>) -> Self {
        Self {
            key: key.as_str().to_owned(),
            suggestion: None,
        }
    }

    /// Constructs an error for an unknown key, with the closest
    /// of the known `keys` as a suggestion when the `did-you-mean`
    /// feature is enabled.
    #[cold]
    pub fn with_suggestions<'k>(
        key: &JsonPointerSegment<'_>,
        keys: impl IntoIterator<Item = &'k str>,
    ) -> Self {
        #[cfg(feature = "did-you-mean")]
        let suggestion = keys
            .into_iter()
            .map(|candidate| (candidate, strsim::jaro_winkler(key.as_str(), candidate)))
            // Jaro-Winkler is a similarity, so higher scores are closer.
            .filter(|&(_, score)| score > 0.8)
            .max_by(|&(_, a), &(_, b)| a.total_cmp(&b))
            .map(|(candidate, _)| candidate.to_owned());
        #[cfg(not(feature = "did-you-mean"))]
        let suggestion = {
            let _ = keys;
            None
        };
        Self {
            key: key.as_str().to_owned(),
            suggestion,
        }
    }
}

impl std::error::Error for BadJsonPointerKey {}

impl Display for BadJsonPointerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suggestion {
            Some(suggestion) => write!(
                f,
                "unknown key {:?}; did you mean {suggestion:?}?",
                self.key
            ),
            None => write!(f, "unknown key {:?}", self.key),
        }
    }
}

/// An error that occurs when a pointer can't descend
/// into a value of the given kind.
#[derive(Debug)]
pub struct BadJsonPointerTy {
    pub pointer: String,
    pub ty: &'static str,
}

impl BadJsonPointerTy {
    #[cold]
    pub fn new(pointer: &JsonPointer<'_>, ty: &'static str) -> Self {
        Self {
            pointer: pointer.to_string(),
            ty,
        }
    }
}

impl std::error::Error for BadJsonPointerTy {}

impl Display for BadJsonPointerTy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "can't resolve {:?} against {}", self.pointer, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer() {
        let pointer = JsonPointer::parse("/foo/bar/0").unwrap();
        let segments = pointer.segments().map(|s| s.as_str()).collect_vec();
        assert_eq!(segments, ["foo", "bar", "0"]);
    }

    #[test]
    fn test_parse_pointer_escaping() {
        let pointer = JsonPointer::parse("/foo~1bar/baz~0qux").unwrap();
        let segments = pointer.segments().map(|s| s.as_str()).collect_vec();
        assert_eq!(segments, ["foo/bar", "baz~qux"]);
    }

    #[test]
    fn test_parse_pointer_missing_slash() {
        assert!(matches!(
            JsonPointer::parse("foo"),
            Err(BadJsonPointerSyntax::MissingLeadingSlash)
        ));
    }

    #[test]
    fn test_parse_fragment_percent_decodes() {
        let pointer = JsonPointer::parse_fragment("/components/schemas/Caf%C3%A9%20Order").unwrap();
        assert_eq!(pointer.last().map(|s| s.as_str()), Some("Café Order"));
    }

    #[test]
    fn test_parse_fragment_decodes_before_unescaping() {
        // `%7E1` decodes to a literal `~1`, which then unescapes to `/`.
        let pointer = JsonPointer::parse_fragment("/a%7E1b").unwrap();
        assert_eq!(pointer.last().map(|s| s.as_str()), Some("a/b"));
    }

    #[test]
    fn test_parse_fragment_rejects_bad_utf8() {
        assert!(matches!(
            JsonPointer::parse_fragment("/%FF"),
            Err(BadJsonPointerSyntax::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_display_round_trips_escapes() {
        let pointer = JsonPointer::parse("/foo~1bar/baz~0qux").unwrap();
        assert_eq!(pointer.to_string(), "/foo~1bar/baz~0qux");
    }

    #[test]
    fn test_to_index() {
        assert_eq!(JsonPointerSegment::new("0").to_index(), Some(0));
        assert_eq!(JsonPointerSegment::new("12").to_index(), Some(12));
        assert_eq!(JsonPointerSegment::new("012").to_index(), None);
        assert_eq!(JsonPointerSegment::new("+1").to_index(), None);
        assert_eq!(JsonPointerSegment::new("-").to_index(), None);
    }

    #[test]
    fn test_resolve_vec() {
        let data = vec![1i64, 2, 3];
        let pointer = JsonPointer::parse("/1").unwrap();
        let result = data.resolve(pointer).unwrap();
        assert_eq!(result.downcast_ref::<i64>(), Some(&2));
    }

    #[test]
    fn test_resolve_vec_out_of_range() {
        let data = vec![1i64];
        let pointer = JsonPointer::parse("/3").unwrap();
        assert!(matches!(
            data.resolve(pointer),
            Err(BadJsonPointer::Index(3, _))
        ));
    }

    #[test]
    fn test_resolve_btreemap() {
        let data = BTreeMap::from([("foo".to_owned(), true)]);
        let pointer = JsonPointer::parse("/foo").unwrap();
        let result = data.resolve(pointer).unwrap();
        assert_eq!(result.downcast_ref::<bool>(), Some(&true));
    }

    #[test]
    fn test_resolve_none_with_key() {
        let data: Option<String> = None;
        let pointer = JsonPointer::parse("/foo").unwrap();
        assert!(matches!(data.resolve(pointer), Err(BadJsonPointer::Key(_))));
    }

    #[test]
    fn test_leaf_rejects_non_empty_pointer() {
        let data = "hello".to_owned();
        let pointer = JsonPointer::parse("/foo").unwrap();
        assert!(matches!(data.resolve(pointer), Err(BadJsonPointer::Ty(_))));
    }

    #[cfg(feature = "did-you-mean")]
    #[test]
    fn test_unknown_key_suggestion() {
        let data = BTreeMap::from([("Pet".to_owned(), 1i64), ("Owner".to_owned(), 2)]);
        let pointer = JsonPointer::parse("/Pett").unwrap();
        let Err(BadJsonPointer::Key(err)) = data.resolve(pointer) else {
            panic!("expected unknown key error");
        };
        assert_eq!(err.suggestion.as_deref(), Some("Pet"));
    }

    #[cfg(feature = "indexmap")]
    #[test]
    fn test_resolve_indexmap() {
        let mut data = indexmap::IndexMap::new();
        data.insert("foo".to_owned(), vec![1i64, 2]);
        let pointer = JsonPointer::parse("/foo/0").unwrap();
        let result = data.resolve(pointer).unwrap();
        assert_eq!(result.downcast_ref::<i64>(), Some(&1));
    }

    #[cfg(feature = "serde_json")]
    #[test]
    fn test_resolve_json_value() {
        let data = serde_json::json!({"a": [{"b": "c"}]});
        let pointer = JsonPointer::parse("/a/0/b").unwrap();
        let result = data.resolve(pointer).unwrap();
        assert_eq!(
            result.downcast_ref::<serde_json::Value>(),
            Some(&serde_json::json!("c"))
        );
    }
}
