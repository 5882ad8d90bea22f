use std::collections::HashMap;
use std::rc::Rc;

/// Object identifier: (object_number, generation_number).
/// `(0, 65535)` is reserved as the head of the xref free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32, pub u16);

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.1)
    }
}

/// A dictionary of name keys to PDF objects.
///
/// Preserves insertion order (per PDF 32000-1:2008 Section 7.3.7 iteration
/// order is unspecified, but deterministic order keeps resolution and
/// serialization reproducible). Duplicate keys are last-write-wins: the
/// value is replaced in place, keeping the key's original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    entries: Vec<(String, PdfObject)>,
}

impl Dict {
    pub fn new() -> Self {
        Dict { entries: Vec::new() }
    }

    /// Insert a key-value pair. An existing key keeps its position but
    /// takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: PdfObject) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PdfObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, PdfObject)> for Dict {
    fn from_iter<T: IntoIterator<Item = (String, PdfObject)>>(iter: T) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// Represents PDF object types per PDF 32000-1:2008 Section 7.3.
///
/// Literal and hex strings both decode to raw bytes: PDF strings are
/// 8-bit-clean payloads, not UTF-8 text.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Decoded string payload (literal or hex form).
    String(Vec<u8>),
    /// PDF name object (stored without the leading `/`).
    Name(String),
    Array(Vec<PdfObject>),
    Dictionary(Dict),
    Stream {
        dict: Dict,
        /// Raw payload bytes as found in the file; no filter is applied.
        data: Vec<u8>,
    },
    /// A typed handle into the object table; does not own the target.
    Reference(ObjId),
    /// A resolved indirect object spliced into a tree by deep resolution.
    Indirect(Rc<IndirectObject>),
}

/// Structural classification of a [`PdfObject`], for tag dispatch without
/// pattern matching at every call site. `Integer` and `Real` both classify
/// as `Number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Null,
    Boolean,
    Number,
    String,
    Name,
    Array,
    Dictionary,
    Stream,
    Reference,
    Indirect,
}

impl PdfObject {
    pub fn name(s: &str) -> Self {
        PdfObject::Name(s.to_string())
    }

    pub fn string(bytes: &[u8]) -> Self {
        PdfObject::String(bytes.to_vec())
    }

    pub fn reference(obj_num: u32, gen: u16) -> Self {
        PdfObject::Reference(ObjId(obj_num, gen))
    }

    pub fn array(items: Vec<PdfObject>) -> Self {
        PdfObject::Array(items)
    }

    pub fn dict(entries: Vec<(&str, PdfObject)>) -> Self {
        PdfObject::Dictionary(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn stream(dict_entries: Vec<(&str, PdfObject)>, data: Vec<u8>) -> Self {
        PdfObject::Stream {
            dict: dict_entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            data,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            PdfObject::Null => ObjectKind::Null,
            PdfObject::Boolean(_) => ObjectKind::Boolean,
            PdfObject::Integer(_) | PdfObject::Real(_) => ObjectKind::Number,
            PdfObject::String(_) => ObjectKind::String,
            PdfObject::Name(_) => ObjectKind::Name,
            PdfObject::Array(_) => ObjectKind::Array,
            PdfObject::Dictionary(_) => ObjectKind::Dictionary,
            PdfObject::Stream { .. } => ObjectKind::Stream,
            PdfObject::Reference(_) => ObjectKind::Reference,
            PdfObject::Indirect(_) => ObjectKind::Indirect,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value of an `Integer` or `Real`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(n) => Some(*n as f64),
            PdfObject::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            PdfObject::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            PdfObject::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<(&Dict, &[u8])> {
        match self {
            PdfObject::Stream { dict, data } => Some((dict, data)),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjId> {
        match self {
            PdfObject::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_indirect(&self) -> Option<&Rc<IndirectObject>> {
        match self {
            PdfObject::Indirect(obj) => Some(obj),
            _ => None,
        }
    }
}

/// A named object in the file: `N G obj … endobj`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub id: ObjId,
    pub value: PdfObject,
}

/// Mapping from `(object_number, generation)` to indirect objects.
///
/// Append-only during parsing. Re-inserting an existing key replaces the
/// entry, so incremental-update bodies shadow earlier definitions
/// ("latest wins").
#[derive(Debug, Default)]
pub struct ObjectTable {
    entries: HashMap<ObjId, Rc<IndirectObject>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        ObjectTable {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, obj: IndirectObject) {
        self.entries.insert(obj.id, Rc::new(obj));
    }

    pub fn get(&self, id: ObjId) -> Option<&Rc<IndirectObject>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ObjId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjId, &Rc<IndirectObject>)> {
        self.entries.iter()
    }
}
