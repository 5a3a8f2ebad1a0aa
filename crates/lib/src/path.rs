//! Paths addressing nodes in a field tree.
//!
//! A [`Path`] is an ordered sequence of [`Key`]s: property names for
//! field-sets and integer indices for field-arrays. Paths are written in
//! dotted/bracketed notation, `contactInfo.email` or `friends[2].name`.
//!
//! # Usage
//!
//! ```rust
//! use formtree::path::{Key, Path};
//! use std::str::FromStr;
//!
//! let path = Path::from_str("friends[2].name")?;
//! assert_eq!(path.keys(), &[Key::from("friends"), Key::Index(2), Key::from("name")]);
//! assert_eq!(path.to_string(), "friends[2].name");
//!
//! // Build incrementally (infallible)
//! let built = Path::new().push("friends").push(2).push("name");
//! assert_eq!(built, path);
//! # Ok::<(), formtree::path::PathError>(())
//! ```

use std::{fmt, ops::Deref, str::FromStr};

use thiserror::Error;

/// Error type for path parsing and key validation failures.
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// A name key contains a character reserved by the path notation.
    #[error("Invalid component '{component}': {reason}")]
    InvalidComponent { component: String, reason: String },

    /// A bracketed index could not be parsed.
    #[error("Malformed index in '{path}' at {position}: {reason}")]
    MalformedIndex {
        path: String,
        position: usize,
        reason: String,
    },
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(untagged)]
pub enum Key {
    /// Position inside a field-array
    Index(usize),
    /// Property inside a field-set
    Name(String),
}

impl Key {
    /// Creates a validated name key.
    ///
    /// # Errors
    /// Returns an error if the name is empty or contains `.`, `[` or `]`,
    /// which would not survive a format/parse round trip.
    pub fn name(name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PathError::InvalidComponent {
                component: name,
                reason: "components cannot be empty".to_string(),
            });
        }
        if name.contains(['.', '[', ']']) {
            return Err(PathError::InvalidComponent {
                component: name,
                reason: "components cannot contain '.', '[' or ']'".to_string(),
            });
        }
        Ok(Key::Name(name))
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Formats keys in dotted/bracketed notation.
///
/// ```rust
/// # use formtree::path::{to_path, Key};
/// let keys = [Key::from("friends"), Key::Index(0), Key::from("name")];
/// assert_eq!(to_path(&keys), "friends[0].name");
/// ```
pub fn to_path(keys: &[Key]) -> String {
    let mut out = String::with_capacity(keys.len() * 8);
    for (i, key) in keys.iter().enumerate() {
        match key {
            Key::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            Key::Name(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(name);
            }
        }
    }
    out
}

/// Parses dotted/bracketed notation into keys.
///
/// Empty components between dots are dropped (`a..b` is `a.b`). Brackets must
/// hold a decimal index and be followed by `.`, `[` or the end of the input.
///
/// ```rust
/// # use formtree::path::{to_names, Key};
/// assert_eq!(
///     to_names("a.b[2].c").unwrap(),
///     vec![Key::from("a"), Key::from("b"), Key::Index(2), Key::from("c")]
/// );
/// assert!(to_names("a[x]").is_err());
/// ```
pub fn to_names(input: &str) -> Result<Vec<Key>, PathError> {
    let malformed = |position: usize, reason: &str| PathError::MalformedIndex {
        path: input.to_string(),
        position,
        reason: reason.to_string(),
    };

    let mut keys = Vec::new();
    let mut name = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            '.' => flush_name(&mut name, &mut keys),
            '[' => {
                flush_name(&mut name, &mut keys);
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some((_, ']')) => break,
                        Some((_, d)) if d.is_ascii_digit() => digits.push(d),
                        Some((at, _)) => return Err(malformed(at, "index must be decimal digits")),
                        None => return Err(malformed(position, "unclosed '['")),
                    }
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| malformed(position, "empty or oversized index"))?;
                keys.push(Key::Index(index));
                if let Some(&(at, next)) = chars.peek()
                    && next != '.'
                    && next != '['
                {
                    return Err(malformed(at, "expected '.' or '[' after ']'"));
                }
            }
            ']' => return Err(malformed(position, "unmatched ']'")),
            other => name.push(other),
        }
    }
    flush_name(&mut name, &mut keys);
    Ok(keys)
}

fn flush_name(name: &mut String, keys: &mut Vec<Key>) {
    if !name.is_empty() {
        keys.push(Key::Name(std::mem::take(name)));
    }
}

/// An owned path into a field tree.
///
/// Dereferences to `[Key]`, so it can be passed wherever the
/// [`ops`](crate::ops) primitives expect a key slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    keys: Vec<Key>,
}

impl Path {
    /// Creates the empty (root) path.
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    pub fn from_keys(keys: impl IntoIterator<Item = impl Into<Key>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a key, builder style.
    pub fn push(mut self, key: impl Into<Key>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Returns a new path with `key` appended.
    pub fn child(&self, key: impl Into<Key>) -> Self {
        self.clone().push(key)
    }

    /// Joins this path with another path.
    pub fn join(mut self, other: impl AsRef<[Key]>) -> Self {
        self.keys.extend(other.as_ref().iter().cloned());
        self
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        self.keys.split_last().map(|(_, init)| Path {
            keys: init.to_vec(),
        })
    }

    /// Returns the final key, or `None` for the root.
    pub fn last(&self) -> Option<&Key> {
        self.keys.last()
    }

    /// Replaces the key at `depth`, used when an array element is re-keyed.
    pub(crate) fn with_key_at(&self, depth: usize, key: Key) -> Path {
        let mut keys = self.keys.clone();
        if let Some(slot) = keys.get_mut(depth) {
            *slot = key;
        }
        Path { keys }
    }

    pub fn starts_with(&self, prefix: impl AsRef<[Key]>) -> bool {
        self.keys.starts_with(prefix.as_ref())
    }
}

impl Deref for Path {
    type Target = [Key];

    fn deref(&self) -> &Self::Target {
        &self.keys
    }
}

impl AsRef<[Key]> for Path {
    fn as_ref(&self) -> &[Key] {
        &self.keys
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { keys: to_names(s)? })
    }
}

impl From<Vec<Key>> for Path {
    fn from(keys: Vec<Key>) -> Self {
        Self { keys }
    }
}

impl From<&[Key]> for Path {
    fn from(keys: &[Key]) -> Self {
        Self {
            keys: keys.to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            write!(f, "(root)")
        } else {
            write!(f, "{}", to_path(&self.keys))
        }
    }
}

impl serde::Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_path(&self.keys))
    }
}

/// Constructs a [`Path`] from keys.
///
/// String arguments become name keys and integers become index keys.
///
/// ```rust
/// # use formtree::path;
/// let path = path!("friends", 1, "name");
/// assert_eq!(path.to_string(), "friends[1].name");
///
/// let root = path!();
/// assert!(root.is_empty());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::new()
    };

    ($($key:expr),+ $(,)?) => {{
        let path = $crate::path::Path::new();
        $(
            let path = path.push($crate::path::Key::from($key));
        )+
        path
    }};
}
