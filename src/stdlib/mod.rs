//! Global object, intrinsics, and the built-in method library (`§4.7`).
//!
//! `install` bootstraps one `Engine`'s entire prototype graph from scratch:
//! it cannot lean on `Evaluator::new_plain_object`/`realm()` (there is no
//! `Realm` yet), so it allocates every prototype object directly through
//! the heap, assembles the `Realm`, installs it, and only then lets each
//! submodule attach constructors/methods using the ordinary
//! `make_host_function`/`get_property` helpers like any other guest-facing
//! code. Per `§5` "Shared resources", none of this is process-wide: every
//! `Engine` gets its own arena and its own copy of every object built here.

mod array_builtin;
mod bigint_builtin;
mod boolean_builtin;
mod date_builtin;
mod error_builtin;
mod function_builtin;
mod generator_builtin;
mod globals;
mod json_builtin;
mod map_set_builtin;
mod math_builtin;
mod number_builtin;
mod object_builtin;
mod promise_ctor;
pub(crate) mod regexp;
pub(crate) mod regexp_builtin;
mod string_builtin;
mod symbol_builtin;
mod typed_array_builtin;

use ahash::AHashMap;

use crate::evaluator::{Evaluator, Realm};
use crate::exception::ExcType;
use crate::function::HostFn;
use crate::heap::{HeapData, TypedArrayKind};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

/// Installs a non-enumerable host method onto an already-allocated object
/// (a prototype or a constructor), the shape every submodule's method table
/// boils down to.
pub(crate) fn def_method(ev: &mut Evaluator, target: crate::heap::HeapId, name: &str, arity: usize, f: HostFn) {
    let func = ev.make_host_function(name, arity, f);
    if let Some(obj) = ev.heap_mut().get_mut(target).as_object_mut() {
        obj.set_own(PropertyKey::from_str(name), PropertyDescriptor::builtin_method(func));
    }
}

pub(crate) fn def_value(ev: &mut Evaluator, target: crate::heap::HeapId, name: &str, value: Value) {
    if let Some(obj) = ev.heap_mut().get_mut(target).as_object_mut() {
        obj.set_own(PropertyKey::from_str(name), PropertyDescriptor::non_enumerable(value));
    }
}

pub(crate) fn install(ev: &mut Evaluator) {
    let object_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::new(None)));
    let function_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Function")));
    let array_proto = ev.heap_mut().alloc(HeapData::Array(crate::heap::JsArray {
        object: JsObject::with_class(Some(object_proto), "Array"),
        elements: Vec::new(),
    }));
    let string_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "String")));
    let number_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Number")));
    let boolean_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Boolean")));
    let bigint_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "BigInt")));
    let symbol_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Symbol")));

    let mut error_protos = AHashMap::new();
    let error_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Error")));
    error_protos.insert(ExcType::Error, error_proto);
    for kind in [ExcType::TypeError, ExcType::RangeError, ExcType::ReferenceError, ExcType::SyntaxError, ExcType::EvalError, ExcType::UriError] {
        let proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(error_proto), "Error")));
        error_protos.insert(kind, proto);
    }

    let promise_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Promise")));
    let generator_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Generator")));
    let map_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Map")));
    let set_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "Set")));
    let weak_map_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "WeakMap")));
    let weak_set_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "WeakSet")));
    let regexp_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "RegExp")));
    let array_buffer_proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "ArrayBuffer")));

    let mut typed_array_protos = AHashMap::new();
    for kind in [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ] {
        let proto = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), kind.constructor_name())));
        typed_array_protos.insert(kind, proto);
    }

    let global_object = ev.heap_mut().alloc(HeapData::Object(JsObject::with_class(Some(object_proto), "global")));
    let mut global_env_data = crate::heap::EnvironmentData::new(None, true);
    global_env_data.has_this_binding = true;
    global_env_data.this_value = Some(Value::Object(global_object));
    let global_env = ev.heap_mut().alloc(HeapData::Environment(global_env_data));

    ev.set_realm(Realm {
        global_object,
        global_env,
        object_proto,
        function_proto,
        array_proto,
        string_proto,
        number_proto,
        boolean_proto,
        bigint_proto,
        symbol_proto,
        error_protos,
        promise_proto,
        generator_proto,
        map_proto,
        set_proto,
        weak_map_proto,
        weak_set_proto,
        regexp_proto,
        array_buffer_proto,
        typed_array_protos,
    });

    function_builtin::install(ev);
    object_builtin::install(ev);
    array_builtin::install(ev);
    string_builtin::install(ev);
    number_builtin::install(ev);
    boolean_builtin::install(ev);
    bigint_builtin::install(ev);
    symbol_builtin::install(ev);
    math_builtin::install(ev);
    json_builtin::install(ev);
    error_builtin::install(ev);
    map_set_builtin::install(ev);
    promise_ctor::install(ev);
    typed_array_builtin::install(ev);
    regexp_builtin::install(ev);
    date_builtin::install(ev);
    generator_builtin::install(ev);
    globals::install(ev);
}
