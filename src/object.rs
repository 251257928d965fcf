//! Own-property storage shared by every heap-allocated JS value: plain
//! objects, arrays, functions, and the built-in exotic objects all embed a
//! [`JsObject`] for their property map, prototype link, and extensibility
//! flag (`§3` "Object").

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::heap::HeapId;
use crate::intern::SymbolId;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum PropertyKey {
    String(Rc<str>),
    Symbol(SymbolIdKey),
}

/// `SymbolId` (`Rc<SymbolData>`) doesn't implement `Hash`/`Eq` against its
/// payload by default semantics we want (pointer identity, not description
/// equality) — this wrapper makes that explicit instead of relying on `Rc`'s
/// incidental `Hash`/`Eq` forwarding.
#[derive(Debug, Clone)]
pub(crate) struct SymbolIdKey(pub SymbolId);

impl PartialEq for SymbolIdKey {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SymbolIdKey {}
impl std::hash::Hash for SymbolIdKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl PropertyKey {
    pub fn from_str(s: &str) -> Self {
        Self::String(Rc::from(s))
    }

    pub fn symbol(id: SymbolId) -> Self {
        Self::Symbol(SymbolIdKey(id))
    }

    /// ECMAScript treats a property key as an "array index" when it is the
    /// canonical decimal string form of an integer in `[0, 2^32 - 2]`.
    /// `§4.6` "Tie-breaks": integer-indexed keys iterate in ascending
    /// numeric order ahead of insertion-ordered string keys.
    pub fn as_array_index(&self) -> Option<u32> {
        match self {
            Self::String(s) => {
                if s.is_empty() {
                    return None;
                }
                if s.as_ref() == "0" {
                    return Some(0);
                }
                if s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                s.parse::<u32>().ok().filter(|n| *n != u32::MAX)
            }
            Self::Symbol(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}
impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PropertyDescriptor {
    Data { value: Value, writable: bool, enumerable: bool, configurable: bool },
    Accessor { get: Option<Value>, set: Option<Value>, enumerable: bool, configurable: bool },
}

impl PropertyDescriptor {
    pub fn data(value: Value) -> Self {
        Self::Data { value, writable: true, enumerable: true, configurable: true }
    }

    /// Used for built-in methods installed on prototypes: not enumerable
    /// (so `for…in`/`Object.keys` on user objects don't surface them),
    /// matching `§4.6`'s descriptor-aware operations.
    pub fn builtin_method(value: Value) -> Self {
        Self::Data { value, writable: true, enumerable: false, configurable: true }
    }

    pub fn non_enumerable(value: Value) -> Self {
        Self::Data { value, writable: true, enumerable: false, configurable: true }
    }

    pub fn enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }
}

/// Identifies the declaring class of a private field/method for the
/// "textual lexical scope matches the declaring class" access check
/// (`§4.6` "Classes", `§9` "Private fields"). The constructor function's
/// own `HeapId` is a convenient unique id: one per `class` declaration.
pub(crate) type ClassId = HeapId;

/// Own-property storage embedded by every heap object variant.
#[derive(Debug, Clone)]
pub(crate) struct JsObject {
    pub properties: IndexMap<PropertyKey, PropertyDescriptor, ahash::RandomState>,
    pub prototype: Option<HeapId>,
    pub extensible: bool,
    pub class_name: &'static str,
    /// `(declaring class, field name) -> value`, scoped per `§9` "Private
    /// fields": a per-instance map keyed by declaring-class identity.
    pub private_fields: AHashMap<(ClassId, Rc<str>), Value>,
    /// Set by `new String(...)`/`new Number(...)`/`new Boolean(...)` boxed
    /// wrapper objects; read by `valueOf`.
    pub primitive_value: Option<Value>,
}

impl JsObject {
    pub fn new(prototype: Option<HeapId>) -> Self {
        Self {
            properties: IndexMap::default(),
            prototype,
            extensible: true,
            class_name: "Object",
            private_fields: AHashMap::new(),
            primitive_value: None,
        }
    }

    pub fn with_class(prototype: Option<HeapId>, class_name: &'static str) -> Self {
        let mut obj = Self::new(prototype);
        obj.class_name = class_name;
        obj
    }

    pub fn get_own(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }

    pub fn set_own(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        self.properties.insert(key, desc);
    }

    pub fn delete_own(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            Some(d) if !d.configurable() => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Own keys in ECMAScript `[[OwnPropertyKeys]]` order: ascending
    /// integer-index keys, then string keys in insertion order, then
    /// symbol keys in insertion order (`§4.6` "Tie-breaks").
    pub fn own_keys_ordered(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<u32> = Vec::new();
        let mut strings: Vec<PropertyKey> = Vec::new();
        let mut symbols: Vec<PropertyKey> = Vec::new();
        for key in self.properties.keys() {
            if let Some(idx) = key.as_array_index() {
                indices.push(idx);
            } else {
                match key {
                    PropertyKey::String(_) => strings.push(key.clone()),
                    PropertyKey::Symbol(_) => symbols.push(key.clone()),
                }
            }
        }
        indices.sort_unstable();
        let mut out: Vec<PropertyKey> = indices.into_iter().map(|i| PropertyKey::from_str(&i.to_string())).collect();
        out.extend(strings);
        out.extend(symbols);
        out
    }
}
