//! The `Engine`'s object arena.
//!
//! Every heap-allocated JS value (plain object, array, function, `Map`,
//! `Promise`, …) lives in one `Vec<HeapData>` behind a [`HeapId`] index —
//! the "arena index... newtype handle" pattern `DESIGN NOTES` (`§9`) asks
//! for prototypes and cyclic structures. Unlike the teacher crate's heap,
//! this arena does not refcount or free individual slots: a JS program can
//! build arbitrary closure/object cycles (a closure capturing an object
//! that holds that same closure), and since this engine has no guest-level
//! finalizers to run deterministically, the simplest correct policy is "the
//! whole arena is freed when `Engine` drops." See `DESIGN.md`, "Heap
//! retention" for why this trims the teacher's refcounting machinery
//! instead of porting it.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::function::FunctionData;
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

/// An opaque handle into an `Engine`'s object arena (`§6` "JS objects as
/// opaque handles whose properties can be read by the host"). Two handles
/// compare equal iff they name the same arena slot; the host cannot mint one
/// except by receiving it back from [`Value::Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u32);

impl HeapId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A JS array: dense element storage plus the shared [`JsObject`] for
/// non-index properties (`length` is a property on `object`, kept
/// consistent with `elements.len()` by the evaluator's array-write path).
#[derive(Debug)]
pub(crate) struct JsArray {
    pub object: JsObject,
    /// Dense prefix; `None` entries are holes (`§4.6` "`Array(n)`... creates
    /// a length-`n` array with holes; holes read as `undefined`").
    pub elements: Vec<Option<Value>>,
}

#[derive(Debug)]
pub(crate) struct MapData {
    pub object: JsObject,
    pub entries: Vec<(Value, Value)>,
}

#[derive(Debug)]
pub(crate) struct SetData {
    pub object: JsObject,
    pub entries: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug)]
pub(crate) struct PromiseReaction {
    pub on_fulfilled: Option<Value>,
    pub on_rejected: Option<Value>,
    /// The promise returned by the `.then()` call that registered this
    /// reaction, resolved/rejected once the reaction's callback runs.
    pub result_promise: HeapId,
}

#[derive(Debug)]
pub(crate) struct PromiseData {
    pub object: JsObject,
    pub state: PromiseState,
    pub value: Value,
    pub reactions: Vec<PromiseReaction>,
    /// Set once a rejected promise's value has been observed by a
    /// reaction, so the event loop can tell "unhandled" rejections apart
    /// (`§7` "Unhandled rejections... re-raised... and mirrored onto the
    /// exception channel").
    pub handled: bool,
}

#[derive(Debug)]
pub(crate) struct ArrayBufferData {
    pub object: JsObject,
    pub bytes: Vec<u8>,
    pub max_byte_length: Option<usize>,
    pub detached: bool,
}

impl ArrayBufferData {
    /// `ArrayBuffer.prototype.resize` (`§4.7`): only `new ArrayBuffer(len,
    /// { maxByteLength })` buffers are resizable; growth zero-fills, shrink
    /// truncates. Out-of-range requests are the caller's `RangeError` to
    /// raise, not this method's.
    pub fn resize(&mut self, new_len: usize) -> bool {
        match self.max_byte_length {
            Some(max) if new_len <= max => {
                self.bytes.resize(new_len, 0);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub fn bytes_per_element(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Uint8Clamped => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 | Self::BigInt64 | Self::BigUint64 => 8,
        }
    }

    pub fn constructor_name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::BigInt64 => "BigInt64Array",
            Self::BigUint64 => "BigUint64Array",
        }
    }
}

/// A view over an [`ArrayBufferData`]. `length_tracking` views (created
/// without an explicit length on a resizable buffer) recompute their
/// length from the buffer's current size on every access, per `§4.6`
/// "TypedArrays".
#[derive(Debug)]
pub(crate) struct TypedArrayData {
    pub object: JsObject,
    pub buffer: HeapId,
    pub kind: TypedArrayKind,
    pub byte_offset: usize,
    pub fixed_length: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct RegExpData {
    pub object: JsObject,
    pub source: Rc<str>,
    pub flags: Rc<str>,
    pub global: bool,
    pub sticky: bool,
    pub last_index: u32,
    pub compiled: Rc<crate::stdlib::regexp::CompiledRegex>,
}

/// A generator's suspended execution state, resumed by `next`/`return`/
/// `throw` (`§4.6` "Generators"). The evaluator's generator driver keeps a
/// cursor into the body's statement list plus the (function-scope)
/// environment that survives across yields; `resume_point` is opaque to
/// this module and interpreted by `evaluator::generator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GeneratorStatus {
    SuspendedStart,
    SuspendedYield,
    Running,
    Completed,
}

#[derive(Debug)]
pub(crate) struct GeneratorData {
    pub object: JsObject,
    pub status: GeneratorStatus,
    pub frame: Option<crate::evaluator::generator::GeneratorFrame>,
}

/// A lexical scope frame (`§3` "Environment"). Stored on the heap (rather
/// than in an `Rc<RefCell<_>>` tree) so it participates in the same
/// arena-index discipline as every other handle a closure might capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Var,
    Let,
    Const,
    Param,
    FunctionDecl,
}

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub value: Value,
    pub kind: BindingKind,
    /// `false` between entering a scope containing a `let`/`const` and
    /// reaching its declaration — the TDZ (`§4.6` "Scoping").
    pub initialized: bool,
    pub mutable: bool,
}

#[derive(Debug)]
pub(crate) struct EnvironmentData {
    pub bindings: ahash::AHashMap<Rc<str>, Slot>,
    pub parent: Option<HeapId>,
    pub this_value: Option<Value>,
    pub is_function_scope: bool,
    /// Non-strict plain calls bind `this` to the global object lazily, so
    /// `this_value` being `None` at a function scope means "resolve to the
    /// global object," distinguishing it from an arrow's lack of any
    /// `this` slot at all (arrows never own one; lookup walks to parent).
    pub has_this_binding: bool,
}

impl EnvironmentData {
    pub fn new(parent: Option<HeapId>, is_function_scope: bool) -> Self {
        Self {
            bindings: ahash::AHashMap::new(),
            parent,
            this_value: None,
            is_function_scope,
            has_this_binding: false,
        }
    }
}

pub(crate) enum HeapData {
    Object(JsObject),
    Array(JsArray),
    Function(FunctionData),
    Map(MapData),
    Set(SetData),
    WeakMap(MapData),
    WeakSet(SetData),
    Promise(PromiseData),
    ArrayBuffer(ArrayBufferData),
    TypedArray(TypedArrayData),
    RegExp(RegExpData),
    Generator(GeneratorData),
    Environment(EnvironmentData),
    /// Carries a `BigInt`/primitive description for `Symbol()` host data
    /// isn't needed here: symbols are immediate `Value`s (`intern::SymbolId`),
    /// never heap slots. This variant is unused as a placeholder to keep
    /// the enum easy to extend with future exotic objects.
    BigIntBox(Rc<BigInt>),
}

impl std::fmt::Debug for HeapData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.variant_name())
    }
}

impl HeapData {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "Object",
            Self::Array(_) => "Array",
            Self::Function(_) => "Function",
            Self::Map(_) => "Map",
            Self::Set(_) => "Set",
            Self::WeakMap(_) => "WeakMap",
            Self::WeakSet(_) => "WeakSet",
            Self::Promise(_) => "Promise",
            Self::ArrayBuffer(_) => "ArrayBuffer",
            Self::TypedArray(_) => "TypedArray",
            Self::RegExp(_) => "RegExp",
            Self::Generator(_) => "Generator",
            Self::Environment(_) => "Environment",
            Self::BigIntBox(_) => "BigIntBox",
        }
    }

    /// The embedded [`JsObject`] every variant except `Environment`/
    /// `BigIntBox` carries, used for property get/set/delete dispatch that
    /// doesn't care which exotic object it's operating on.
    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            Self::Object(o) | Self::Array(JsArray { object: o, .. }) => Some(o),
            Self::Function(f) => Some(&f.object),
            Self::Map(m) | Self::WeakMap(m) => Some(&m.object),
            Self::Set(s) | Self::WeakSet(s) => Some(&s.object),
            Self::Promise(p) => Some(&p.object),
            Self::ArrayBuffer(b) => Some(&b.object),
            Self::TypedArray(t) => Some(&t.object),
            Self::RegExp(r) => Some(&r.object),
            Self::Generator(g) => Some(&g.object),
            Self::Environment(_) | Self::BigIntBox(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut JsObject> {
        match self {
            Self::Object(o) | Self::Array(JsArray { object: o, .. }) => Some(o),
            Self::Function(f) => Some(&mut f.object),
            Self::Map(m) | Self::WeakMap(m) => Some(&mut m.object),
            Self::Set(s) | Self::WeakSet(s) => Some(&mut s.object),
            Self::Promise(p) => Some(&mut p.object),
            Self::ArrayBuffer(b) => Some(&mut b.object),
            Self::TypedArray(t) => Some(&mut t.object),
            Self::RegExp(r) => Some(&mut r.object),
            Self::Generator(g) => Some(&mut g.object),
            Self::Environment(_) | Self::BigIntBox(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionData> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut JsArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&EnvironmentData> {
        match self {
            Self::Environment(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_environment_mut(&mut self) -> Option<&mut EnvironmentData> {
        match self {
            Self::Environment(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_typed_array(&self) -> Option<&TypedArrayData> {
        match self {
            Self::TypedArray(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array_buffer(&self) -> Option<&ArrayBufferData> {
        match self {
            Self::ArrayBuffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array_buffer_mut(&mut self) -> Option<&mut ArrayBufferData> {
        match self {
            Self::ArrayBuffer(b) => Some(b),
            _ => None,
        }
    }
}

/// Owns every heap-allocated value for one `Engine`. Arena-append-only:
/// `HeapId`s never move, so `origin`-style back-pointers and closures alike
/// stay valid for the `Engine`'s whole lifetime.
pub(crate) struct Heap {
    slots: Vec<HeapData>,
}

impl Heap {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn alloc(&mut self, data: HeapData) -> HeapId {
        self.slots.push(data);
        HeapId(self.slots.len() as u32 - 1)
    }

    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.slots[id.index()]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Walks the prototype chain for `key`, firing no getters — callers
    /// that need getter semantics use `Evaluator::get_property`, which can
    /// invoke user code; this is the heap-only "does an own-or-inherited
    /// data/accessor slot exist" query it builds on.
    pub fn lookup_property(&self, receiver: HeapId, key: &PropertyKey) -> Option<(HeapId, PropertyDescriptor)> {
        let mut current = Some(receiver);
        let mut seen = 0;
        while let Some(id) = current {
            seen += 1;
            if seen > 10_000 {
                return None; // pathological prototype cycle guard
            }
            if let Some(array) = self.get(id).as_array() {
                if let Some(idx) = key.as_array_index() {
                    if let Some(Some(v)) = array.elements.get(idx as usize) {
                        return Some((id, PropertyDescriptor::data(v.clone())));
                    }
                    if (idx as usize) < array.elements.len() {
                        return None; // hole: own property doesn't exist, don't fall to prototype for this index
                    }
                }
            }
            if let Some(obj) = self.get(id).as_object() {
                if let Some(desc) = obj.get_own(key) {
                    return Some((id, desc.clone()));
                }
                current = obj.prototype;
            } else {
                current = None;
            }
        }
        None
    }

    pub fn is_callable(&self, id: HeapId) -> bool {
        matches!(self.get(id), HeapData::Function(_))
    }

    pub fn class_name(&self, id: HeapId) -> &'static str {
        self.get(id).as_object().map_or("Object", |o| o.class_name)
    }

    /// Effective element count of a `TypedArray` view (`§4.6` "TypedArrays"):
    /// a length-tracking view (`fixed_length: None`) recomputes from the
    /// buffer's current byte length on every access; a fixed-length view
    /// goes "out of bounds" — reporting `0` — the moment a `resize()` on its
    /// backing buffer leaves less room than `byte_offset + fixed_length`
    /// needs, rather than tracking the buffer down to a shorter fixed view.
    pub fn typed_array_length(&self, id: HeapId) -> usize {
        let Some(ta) = self.get(id).as_typed_array() else { return 0 };
        let Some(buf) = self.get(ta.buffer).as_array_buffer() else { return 0 };
        if buf.detached {
            return 0;
        }
        let bpe = ta.kind.bytes_per_element();
        match ta.fixed_length {
            Some(n) => {
                if ta.byte_offset + n * bpe > buf.bytes.len() {
                    0
                } else {
                    n
                }
            }
            None => buf.bytes.len().saturating_sub(ta.byte_offset) / bpe,
        }
    }

    /// Reads element `index`, returning `None` once it's out of the view's
    /// current effective length (the caller folds that into `undefined`).
    pub fn typed_array_get(&self, id: HeapId, index: usize) -> Option<Value> {
        let ta = self.get(id).as_typed_array()?;
        if index >= self.typed_array_length(id) {
            return None;
        }
        let bpe = ta.kind.bytes_per_element();
        let offset = ta.byte_offset + index * bpe;
        let kind = ta.kind;
        let buf = self.get(ta.buffer).as_array_buffer()?;
        let bytes = buf.bytes.get(offset..offset + bpe)?;
        Some(decode_typed_element(kind, bytes))
    }

    /// Writes element `index` if it's within the view's current effective
    /// length; a silent no-op otherwise (matching `§4.6`'s "out of bounds
    /// index writes are ignored" rule for integer-indexed exotic objects).
    pub fn typed_array_set(&mut self, id: HeapId, index: usize, raw: f64) -> bool {
        let Some(ta) = self.get(id).as_typed_array() else { return false };
        if index >= self.typed_array_length(id) {
            return false;
        }
        let bpe = ta.kind.bytes_per_element();
        let offset = ta.byte_offset + index * bpe;
        let kind = ta.kind;
        let buffer = ta.buffer;
        let Some(buf) = self.get_mut(buffer).as_array_buffer_mut() else { return false };
        let encoded = encode_typed_element(kind, raw);
        buf.bytes[offset..offset + bpe].copy_from_slice(&encoded[..bpe]);
        true
    }
}

fn decode_typed_element(kind: TypedArrayKind, bytes: &[u8]) -> Value {
    use num_traits::FromPrimitive;
    match kind {
        TypedArrayKind::Int8 => Value::Number(bytes[0] as i8 as f64),
        TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => Value::Number(bytes[0] as f64),
        TypedArrayKind::Int16 => Value::Number(i16::from_le_bytes(bytes.try_into().unwrap()) as f64),
        TypedArrayKind::Uint16 => Value::Number(u16::from_le_bytes(bytes.try_into().unwrap()) as f64),
        TypedArrayKind::Int32 => Value::Number(i32::from_le_bytes(bytes.try_into().unwrap()) as f64),
        TypedArrayKind::Uint32 => Value::Number(u32::from_le_bytes(bytes.try_into().unwrap()) as f64),
        TypedArrayKind::Float32 => Value::Number(f32::from_le_bytes(bytes.try_into().unwrap()) as f64),
        TypedArrayKind::Float64 => Value::Number(f64::from_le_bytes(bytes.try_into().unwrap())),
        TypedArrayKind::BigInt64 => Value::BigInt(Rc::new(BigInt::from_i64(i64::from_le_bytes(bytes.try_into().unwrap())).unwrap())),
        TypedArrayKind::BigUint64 => Value::BigInt(Rc::new(BigInt::from_u64(u64::from_le_bytes(bytes.try_into().unwrap())).unwrap())),
    }
}

fn encode_typed_element(kind: TypedArrayKind, n: f64) -> [u8; 8] {
    let mut out = [0u8; 8];
    match kind {
        TypedArrayKind::Int8 => out[0] = ops_int_to_i8(n) as u8,
        TypedArrayKind::Uint8 => out[0] = ops_int_to_u32(n) as u8,
        TypedArrayKind::Uint8Clamped => out[0] = n.round().clamp(0.0, 255.0) as u8,
        TypedArrayKind::Int16 => out[..2].copy_from_slice(&(ops_int_to_u32(n) as u16).to_le_bytes()),
        TypedArrayKind::Uint16 => out[..2].copy_from_slice(&(ops_int_to_u32(n) as u16).to_le_bytes()),
        TypedArrayKind::Int32 | TypedArrayKind::Uint32 => out[..4].copy_from_slice(&ops_int_to_u32(n).to_le_bytes()),
        TypedArrayKind::Float32 => out[..4].copy_from_slice(&(n as f32).to_le_bytes()),
        TypedArrayKind::Float64 => out[..8].copy_from_slice(&n.to_le_bytes()),
        TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => out[..8].copy_from_slice(&(n as i64).to_le_bytes()),
    }
    out
}

/// `ToInt32`-ish truncation for the integer typed-array element kinds:
/// `NaN`/infinities fold to `0`, otherwise wraps modulo 2^32 the same way
/// `ops::to_int32` does for bitwise operators.
fn ops_int_to_u32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let truncated = n.trunc();
    let modulo = truncated.rem_euclid(4294967296.0);
    modulo as u32
}

fn ops_int_to_i8(n: f64) -> i8 {
    ops_int_to_u32(n) as u8 as i8
}

