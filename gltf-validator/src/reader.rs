//! Schema-level reading of JSON objects
//!
//! [`ObjectReader`] wraps one JSON object together with its pointer. Every
//! accessor method marks the property as known and reports shape problems
//! (`TYPE_MISMATCH`, `UNDEFINED_PROPERTY`, `VALUE_NOT_IN_RANGE`, ...) at the
//! property's pointer. Anything left unread when the reader finishes is an
//! `UNEXPECTED_PROPERTY`.

use crate::issue::{IssueCode, IssueSink, join_pointer};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::ops::{Bound, RangeBounds};

/// Integer reference into a document collection
///
/// Stored exactly as written so that negative and oversized values can be
/// reported as unresolved rather than rejected during reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index(pub i64);

impl Index {
    /// Position in a collection of `len` entities, if in range
    pub fn get(self, len: usize) -> Option<usize> {
        usize::try_from(self.0).ok().filter(|&i| i < len)
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of JSON object an extension can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Root,
    Asset,
    Accessor,
    AccessorSparse,
    AccessorSparseIndices,
    AccessorSparseValues,
    Animation,
    AnimationChannel,
    AnimationChannelTarget,
    AnimationSampler,
    Buffer,
    BufferView,
    Camera,
    CameraOrthographic,
    CameraPerspective,
    Image,
    Material,
    MaterialPbrMetallicRoughness,
    Mesh,
    MeshPrimitive,
    Node,
    Sampler,
    Scene,
    Skin,
    Texture,
    TextureInfo,
    NormalTextureInfo,
    OcclusionTextureInfo,
    /// Objects defined inside extension payloads
    ExtensionObject,
}

/// An `extensions` entry found while reading
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionSite {
    /// Pointer of the extension object itself
    pub pointer: String,
    /// Pointer of the object carrying the `extensions` property
    pub parent: String,
    pub owner: ObjectKind,
    pub name: String,
    pub value: Value,
}

impl ExtensionSite {
    /// Index of the owning top-level entity, e.g. 3 for `/materials/3/...`
    pub fn entity_index(&self, collection: &str) -> Option<usize> {
        let rest = self.parent.strip_prefix('/')?.strip_prefix(collection)?;
        let rest = rest.strip_prefix('/')?;
        let digits = rest.split('/').next()?;
        digits.parse().ok()
    }
}

/// Mutable state shared by all readers of one document
pub struct ReadContext<'o> {
    pub issues: IssueSink<'o>,
    pub extension_sites: Vec<ExtensionSite>,
}

impl<'o> ReadContext<'o> {
    pub fn new(issues: IssueSink<'o>) -> Self {
        Self {
            issues,
            extension_sites: Vec::new(),
        }
    }
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 64 {
        format!("{}...", text.chars().take(61).collect::<String>())
    } else {
        text
    }
}

fn type_mismatch(value: &Value, expected: &str) -> String {
    format!("Type mismatch. Property value {} is not a '{expected}'.", describe(value))
}

fn range_text<T: Display>(range: &impl RangeBounds<T>) -> String {
    let lower = match range.start_bound() {
        Bound::Included(v) => format!("[{v}"),
        Bound::Excluded(v) => format!("({v}"),
        Bound::Unbounded => "(-inf".to_string(),
    };
    let upper = match range.end_bound() {
        Bound::Included(v) => format!("{v}]"),
        Bound::Excluded(v) => format!("{v})"),
        Bound::Unbounded => "inf)".to_string(),
    };
    format!("{lower}, {upper}")
}

fn list_text<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Integer value of a JSON number, if it has no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

/// Reader over one JSON object
pub struct ObjectReader<'a, 'c, 'o> {
    object: &'a Map<String, Value>,
    pointer: String,
    kind: ObjectKind,
    cx: &'c mut ReadContext<'o>,
    consumed: Vec<&'static str>,
}

/// Read `value` as an object of the given kind, reporting a type mismatch otherwise
pub fn read_object<T>(
    value: &Value,
    pointer: String,
    kind: ObjectKind,
    cx: &mut ReadContext<'_>,
    f: impl FnOnce(&mut ObjectReader<'_, '_, '_>) -> T,
) -> Option<T> {
    let Some(object) = value.as_object() else {
        cx.issues.add(IssueCode::TypeMismatch, pointer, type_mismatch(value, "object"));
        return None;
    };
    let mut reader = ObjectReader {
        object,
        pointer,
        kind,
        cx,
        consumed: Vec::new(),
    };
    let result = f(&mut reader);
    reader.finish();
    Some(result)
}

impl<'a, 'c, 'o> ObjectReader<'a, 'c, 'o> {
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn property_pointer(&self, key: &str) -> String {
        join_pointer(&self.pointer, key)
    }

    /// Report an issue on one of this object's properties
    pub fn issue(&mut self, code: IssueCode, key: &str, message: impl Into<String>) {
        let pointer = self.property_pointer(key);
        self.cx.issues.add(code, pointer, message);
    }

    /// Report an issue on the object itself
    pub fn issue_here(&mut self, code: IssueCode, message: impl Into<String>) {
        self.cx.issues.add(code, self.pointer.clone(), message);
    }

    pub fn context(&mut self) -> &mut ReadContext<'o> {
        &mut *self.cx
    }

    /// Whether the property is present, without marking it read
    pub fn has(&self, key: &str) -> bool {
        self.object.contains_key(key)
    }

    fn take(&mut self, key: &'static str) -> Option<&'a Value> {
        if !self.consumed.contains(&key) {
            self.consumed.push(key);
        }
        self.object.get(key)
    }

    fn missing(&mut self, key: &'static str) {
        self.issue_here(
            IssueCode::UndefinedProperty,
            format!("Property '{key}' must be defined."),
        );
    }

    /// Raw property value
    pub fn value(&mut self, key: &'static str) -> Option<&'a Value> {
        self.take(key)
    }

    pub fn name(&mut self) -> Option<&'a str> {
        self.string("name")
    }

    pub fn string(&mut self, key: &'static str) -> Option<&'a str> {
        let value = self.take(key)?;
        match value.as_str() {
            Some(s) => Some(s),
            None => {
                self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "string"));
                None
            }
        }
    }

    pub fn required_string(&mut self, key: &'static str) -> Option<&'a str> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.string(key)
    }

    /// String restricted to `allowed`; other values are reported and dropped
    pub fn enum_string(&mut self, key: &'static str, allowed: &[&str]) -> Option<&'a str> {
        let value = self.string(key)?;
        if allowed.contains(&value) {
            Some(value)
        } else {
            self.issue(
                IssueCode::ValueNotInList,
                key,
                format!("Invalid value '{value}'. Valid values are ('{}').", allowed.join("', '")),
            );
            None
        }
    }

    pub fn required_enum_string(&mut self, key: &'static str, allowed: &[&str]) -> Option<&'a str> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.enum_string(key, allowed)
    }

    pub fn bool(&mut self, key: &'static str) -> Option<bool> {
        let value = self.take(key)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "boolean"));
                None
            }
        }
    }

    fn integer(&mut self, key: &'static str) -> Option<i64> {
        let value = self.take(key)?;
        match as_integer(value) {
            Some(i) => Some(i),
            None => {
                self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "integer"));
                None
            }
        }
    }

    /// Reference to another entity; range is checked at resolution time
    pub fn index(&mut self, key: &'static str) -> Option<Index> {
        self.integer(key).map(Index)
    }

    pub fn required_index(&mut self, key: &'static str) -> Option<Index> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.index(key)
    }

    /// Non-negative integer inside `range`
    pub fn uint_in(&mut self, key: &'static str, range: impl RangeBounds<u64>) -> Option<u64> {
        let value = self.integer(key)?;
        match u64::try_from(value) {
            Ok(v) if range.contains(&v) => Some(v),
            _ => {
                self.issue(
                    IssueCode::ValueNotInRange,
                    key,
                    format!("Value {value} is out of range {}.", range_text(&range)),
                );
                None
            }
        }
    }

    pub fn uint(&mut self, key: &'static str) -> Option<u64> {
        self.uint_in(key, 0..)
    }

    pub fn required_uint_in(&mut self, key: &'static str, range: impl RangeBounds<u64>) -> Option<u64> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.uint_in(key, range)
    }

    /// Integer restricted to `allowed`
    pub fn enum_uint(&mut self, key: &'static str, allowed: &[u64]) -> Option<u64> {
        let value = self.integer(key)?;
        match u64::try_from(value) {
            Ok(v) if allowed.contains(&v) => Some(v),
            _ => {
                self.issue(
                    IssueCode::ValueNotInList,
                    key,
                    format!("Invalid value {value}. Valid values are ({}).", list_text(allowed)),
                );
                None
            }
        }
    }

    pub fn required_enum_uint(&mut self, key: &'static str, allowed: &[u64]) -> Option<u64> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.enum_uint(key, allowed)
    }

    pub fn float(&mut self, key: &'static str) -> Option<f64> {
        let value = self.take(key)?;
        match value.as_f64() {
            Some(f) => Some(f),
            None => {
                self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "number"));
                None
            }
        }
    }

    /// Number inside `range`; out-of-range values are reported and dropped
    pub fn float_in(&mut self, key: &'static str, range: impl RangeBounds<f64>) -> Option<f64> {
        let value = self.float(key)?;
        if range.contains(&value) {
            Some(value)
        } else {
            self.issue(
                IssueCode::ValueNotInRange,
                key,
                format!("Value {value} is out of range {}.", range_text(&range)),
            );
            None
        }
    }

    pub fn required_float_in(&mut self, key: &'static str, range: impl RangeBounds<f64>) -> Option<f64> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.float_in(key, range)
    }

    /// Raw array, reporting non-arrays and (if `non_empty`) empty ones
    pub fn array(&mut self, key: &'static str, non_empty: bool) -> Option<&'a Vec<Value>> {
        let value = self.take(key)?;
        let Some(items) = value.as_array() else {
            self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "array"));
            return None;
        };
        if non_empty && items.is_empty() {
            self.issue(IssueCode::EmptyEntity, key, "Entity cannot be empty.");
            return None;
        }
        Some(items)
    }

    pub fn required_array(&mut self, key: &'static str, non_empty: bool) -> Option<&'a Vec<Value>> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.array(key, non_empty)
    }

    /// Array of numbers with a length from `lengths` (any length if empty)
    pub fn float_array(
        &mut self,
        key: &'static str,
        lengths: &[usize],
        range: impl RangeBounds<f64>,
    ) -> Option<Vec<f64>> {
        let items = self.array(key, true)?;
        if !lengths.is_empty() && !lengths.contains(&items.len()) {
            self.issue(
                IssueCode::ArrayLengthNotInList,
                key,
                format!(
                    "Invalid array length {}. Valid lengths are: ({}).",
                    items.len(),
                    list_text(lengths)
                ),
            );
            return None;
        }
        let pointer = self.property_pointer(key);
        let mut out = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_f64() {
                Some(f) if range.contains(&f) => out.push(f),
                Some(f) => {
                    self.cx.issues.add(
                        IssueCode::ValueNotInRange,
                        format!("{pointer}/{i}"),
                        format!("Value {f} is out of range {}.", range_text(&range)),
                    );
                    valid = false;
                }
                None => {
                    self.cx.issues.add(
                        IssueCode::ArrayTypeMismatch,
                        format!("{pointer}/{i}"),
                        format!("Array element {} is not a 'number'.", describe(item)),
                    );
                    valid = false;
                }
            }
        }
        valid.then_some(out)
    }

    /// Non-empty array of references, optionally without duplicates
    ///
    /// Any non-integer element invalidates the whole array.
    pub fn index_array(&mut self, key: &'static str, unique: bool) -> Option<Vec<Index>> {
        let items = self.array(key, true)?;
        let pointer = self.property_pointer(key);
        let mut out = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match as_integer(item) {
                Some(v) => {
                    if unique && out.contains(&Index(v)) {
                        self.cx.issues.add(
                            IssueCode::DuplicateElements,
                            format!("{pointer}/{i}"),
                            "Array contains duplicate elements.",
                        );
                    }
                    out.push(Index(v));
                }
                None => {
                    self.cx.issues.add(
                        IssueCode::ArrayTypeMismatch,
                        format!("{pointer}/{i}"),
                        format!("Array element {} is not a 'integer'.", describe(item)),
                    );
                    valid = false;
                }
            }
        }
        valid.then_some(out)
    }

    /// Non-empty array of unique strings
    pub fn string_array(&mut self, key: &'static str) -> Option<Vec<String>> {
        let items = self.array(key, true)?;
        let pointer = self.property_pointer(key);
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(s) => {
                    if out.iter().any(|existing| existing == s) {
                        self.cx.issues.add(
                            IssueCode::DuplicateElements,
                            format!("{pointer}/{i}"),
                            "Array contains duplicate elements.",
                        );
                    } else {
                        out.push(s.to_string());
                    }
                }
                None => self.cx.issues.add(
                    IssueCode::ArrayTypeMismatch,
                    format!("{pointer}/{i}"),
                    format!("Array element {} is not a 'string'.", describe(item)),
                ),
            }
        }
        Some(out)
    }

    /// Raw object property, e.g. attribute maps
    pub fn map(&mut self, key: &'static str) -> Option<&'a Map<String, Value>> {
        let value = self.take(key)?;
        match value.as_object() {
            Some(object) => Some(object),
            None => {
                self.issue(IssueCode::TypeMismatch, key, type_mismatch(value, "object"));
                None
            }
        }
    }

    /// Object whose values are all references, e.g. primitive attributes
    ///
    /// Keys keep document order. Non-integer values are reported and skipped.
    fn index_map_at(&mut self, value: &'a Value, pointer: &str) -> Option<Vec<(String, Index)>> {
        let Some(object) = value.as_object() else {
            self.cx
                .issues
                .add(IssueCode::TypeMismatch, pointer, type_mismatch(value, "object"));
            return None;
        };
        if object.is_empty() {
            self.cx
                .issues
                .add(IssueCode::EmptyEntity, pointer, "Entity cannot be empty.");
            return None;
        }
        let mut out = Vec::with_capacity(object.len());
        for (name, item) in object {
            match as_integer(item) {
                Some(v) => out.push((name.clone(), Index(v))),
                None => self.cx.issues.add(
                    IssueCode::TypeMismatch,
                    join_pointer(pointer, name),
                    type_mismatch(item, "integer"),
                ),
            }
        }
        Some(out)
    }

    pub fn required_index_map(&mut self, key: &'static str) -> Option<Vec<(String, Index)>> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        let value = self.take(key)?;
        let pointer = self.property_pointer(key);
        self.index_map_at(value, &pointer)
    }

    /// Non-empty array of reference maps, e.g. morph targets
    ///
    /// Invalid elements become empty maps so positions stay aligned.
    pub fn index_map_array(&mut self, key: &'static str) -> Option<Vec<Vec<(String, Index)>>> {
        let items = self.array(key, true)?;
        let base = self.property_pointer(key);
        let out = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.index_map_at(item, &format!("{base}/{i}"))
                    .unwrap_or_default()
            })
            .collect();
        Some(out)
    }

    /// Read a nested object with its own reader
    pub fn child<T>(
        &mut self,
        key: &'static str,
        kind: ObjectKind,
        f: impl FnOnce(&mut ObjectReader<'_, '_, '_>) -> T,
    ) -> Option<T> {
        let value = self.take(key)?;
        let pointer = self.property_pointer(key);
        read_object(value, pointer, kind, self.cx, f)
    }

    pub fn required_child<T>(
        &mut self,
        key: &'static str,
        kind: ObjectKind,
        f: impl FnOnce(&mut ObjectReader<'_, '_, '_>) -> T,
    ) -> Option<T> {
        if !self.has(key) {
            self.take(key);
            self.missing(key);
            return None;
        }
        self.child(key, kind, f)
    }

    /// Read every element of an array of objects
    ///
    /// Elements that are not objects become `T::default()` so positions stay
    /// aligned with their indices.
    pub fn child_array<T: Default>(
        &mut self,
        key: &'static str,
        kind: ObjectKind,
        non_empty: bool,
        mut f: impl FnMut(usize, &mut ObjectReader<'_, '_, '_>) -> T,
    ) -> Option<Vec<T>> {
        let items = self.array(key, non_empty)?;
        let base = self.property_pointer(key);
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let element = read_object(item, format!("{base}/{i}"), kind, self.cx, |r| f(i, r));
            out.push(element.unwrap_or_default());
        }
        Some(out)
    }

    /// Report every property nobody read, and record extensions
    fn finish(&mut self) {
        if !self.consumed.contains(&"extras") {
            if let Some(extras) = self.object.get("extras") {
                if !extras.is_object() {
                    self.issue(
                        IssueCode::NonObjectExtras,
                        "extras",
                        "Prefer JSON Objects for extras.",
                    );
                }
            }
        }
        if !self.consumed.contains(&"extensions") {
            self.record_extensions();
        }

        let unexpected: Vec<&String> = self
            .object
            .keys()
            .filter(|key| {
                key.as_str() != "extras"
                    && key.as_str() != "extensions"
                    && !self.consumed.contains(&key.as_str())
            })
            .collect();
        for key in unexpected {
            let pointer = join_pointer(&self.pointer, key);
            self.cx
                .issues
                .add(IssueCode::UnexpectedProperty, pointer, "Unexpected property.");
        }
    }

    fn record_extensions(&mut self) {
        let Some(value) = self.object.get("extensions") else {
            return;
        };
        let Some(extensions) = value.as_object() else {
            self.issue(IssueCode::TypeMismatch, "extensions", type_mismatch(value, "object"));
            return;
        };
        let base = self.property_pointer("extensions");
        for (name, payload) in extensions {
            let pointer = join_pointer(&base, name);
            if !payload.is_object() {
                self.cx
                    .issues
                    .add(IssueCode::TypeMismatch, pointer, type_mismatch(payload, "object"));
                continue;
            }
            self.cx.extension_sites.push(ExtensionSite {
                pointer,
                parent: self.pointer.clone(),
                owner: self.kind,
                name: name.clone(),
                value: payload.clone(),
            });
        }
    }
}
