//! Class evaluation (`§4.6` "Classes"): desugars a `class` declaration or
//! expression into a constructor function plus a prototype object, wiring
//! `extends`, static members, accessors, and private fields/methods.

use std::rc::Rc;

use crate::ast::{ClassDef, ClassMemberKind};
use crate::exception::RunResult;
use crate::function::{Callable, FunctionData, FunctionKind, ThisMode};
use crate::heap::{HeapData, HeapId};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::value::Value;

use super::Evaluator;

/// One instance field initializer, run against each new instance before the
/// constructor body's own statements (`§4.6` "Classes"). Private instance
/// methods ride the same plan as a `Shared` entry: the method closure is
/// built once against the prototype and copied by reference into each
/// instance's private-field map, since `this.#method()` only ever looks in
/// the receiving instance's own map.
pub(crate) enum FieldInit {
    Expr(Option<crate::ast::Expr>),
    Shared(Value),
}

pub(crate) struct ClassFieldInit {
    pub key: PropertyKey,
    pub is_private: bool,
    pub init: FieldInit,
}

pub(crate) fn eval_class(ev: &mut Evaluator, def: &ClassDef, env: HeapId) -> RunResult<Value> {
    let parent = match &def.superclass {
        Some(expr) => {
            let value = super::statements::eval_expr(ev, expr, env)?;
            match value {
                Value::Object(id) if ev.heap().is_callable(id) => Some(id),
                Value::Null => None,
                _ => return ev.throw_type_error("Class extends value is not a constructor"),
            }
        }
        None => None,
    };

    let parent_proto = match parent {
        Some(id) => match ev.get_property(Value::Object(id), "prototype")? {
            Value::Object(p) => Some(p),
            _ => None,
        },
        None => Some(ev.realm().object_proto),
    };
    let proto_obj = ev.heap_mut().alloc(HeapData::Object(JsObject::new(parent_proto)));

    let func_proto = match parent {
        Some(id) => Some(id),
        None => Some(ev.realm().function_proto),
    };

    let constructor_def = def.members.iter().find_map(|m| match &m.kind {
        ClassMemberKind::Method(f) if !m.is_static && matches!(m.key, crate::ast::PropertyKey::Identifier(ref n) if n == "constructor") => Some(f.clone()),
        _ => None,
    });

    // Class body field initializers run at the start of the constructor,
    // after `super(...)` for a derived class (`§4.6` "Classes"). Private
    // instance methods are built now (against `proto_obj` as home object)
    // and ride the same per-instance-copy plan, since private lookups only
    // ever scan the receiving instance's own map.
    let mut instance_fields: Vec<ClassFieldInit> = Vec::new();
    for m in &def.members {
        match &m.kind {
            ClassMemberKind::Field(init) if !m.is_static => {
                let key = if m.is_private {
                    PropertyKey::from_str(&format!("#{}", field_key_name(&m.key)))
                } else {
                    PropertyKey::from_str(&field_key_name(&m.key))
                };
                instance_fields.push(ClassFieldInit { key, is_private: m.is_private, init: FieldInit::Expr(init.clone()) });
            }
            ClassMemberKind::Method(f) if !m.is_static && m.is_private && !is_constructor_member(m) => {
                let key_name = field_key_name(&m.key);
                let func = super::calls::make_function_value(ev, f, env, Some(key_name.clone()))?;
                super::calls::set_home_object(ev, &func, proto_obj);
                instance_fields.push(ClassFieldInit {
                    key: PropertyKey::from_str(&format!("#{key_name}")),
                    is_private: true,
                    init: FieldInit::Shared(func),
                });
            }
            _ => {}
        }
    }

    let name: Rc<str> = Rc::from(def.name.clone().unwrap_or_default());
    let params: Rc<[crate::ast::Param]> = constructor_def.as_ref().map_or_else(|| Rc::from(Vec::new()), |f| Rc::from(f.params.clone()));
    let body = Rc::new(constructor_def.as_ref().map_or_else(
        || crate::ast::FunctionBody::Block(Vec::new()),
        |f| f.body.clone(),
    ));

    let object = JsObject::with_class(func_proto, "Function");
    let ctor_data = FunctionData {
        object,
        name: name.clone(),
        kind: FunctionKind::Constructor,
        this_mode: ThisMode::Dynamic,
        is_async: false,
        is_generator: false,
        callable: Callable::User { params, body, closure: env },
        home_object: Some(proto_obj),
        parent_constructor: parent,
        class_fields: Some(Rc::from(instance_fields)),
    };
    let ctor_id = ev.heap_mut().alloc(HeapData::Function(ctor_data));

    if let Some(obj) = ev.heap_mut().get_mut(ctor_id).as_object_mut() {
        obj.set_own(PropertyKey::from_str("prototype"), PropertyDescriptor::non_enumerable(Value::Object(proto_obj)));
        obj.set_own(PropertyKey::from_str("name"), PropertyDescriptor::non_enumerable(Value::string(name.to_string())));
    }
    if let Some(obj) = ev.heap_mut().get_mut(proto_obj).as_object_mut() {
        obj.set_own(PropertyKey::from_str("constructor"), PropertyDescriptor::non_enumerable(Value::Object(ctor_id)));
    }

    for member in &def.members {
        if matches!(&member.kind, ClassMemberKind::Method(_) if is_constructor_member(member)) {
            continue;
        }
        if !member.is_static && member.is_private && matches!(member.kind, ClassMemberKind::Method(_)) {
            continue; // built into the per-instance field plan above
        }
        let target = if member.is_static { ctor_id } else { proto_obj };
        install_member(ev, member, target, proto_obj, env)?;
    }

    Ok(Value::Object(ctor_id))
}

fn is_constructor_member(member: &crate::ast::ClassMember) -> bool {
    !member.is_static && matches!(&member.key, crate::ast::PropertyKey::Identifier(n) if n == "constructor")
}

fn field_key_name(key: &crate::ast::PropertyKey) -> String {
    match key {
        crate::ast::PropertyKey::Identifier(s) | crate::ast::PropertyKey::String(s) | crate::ast::PropertyKey::Private(s) => s.clone(),
        crate::ast::PropertyKey::Number(n) => crate::ops::number_to_string(*n),
        crate::ast::PropertyKey::Computed(_) => String::new(),
    }
}

fn install_member(
    ev: &mut Evaluator,
    member: &crate::ast::ClassMember,
    target: HeapId,
    proto_obj: HeapId,
    env: HeapId,
) -> RunResult<()> {
    let key_name = field_key_name(&member.key);
    let key = if member.is_private { format!("#{key_name}") } else { key_name };
    match &member.kind {
        ClassMemberKind::Method(f) => {
            let func = super::calls::make_function_value(ev, f, env, Some(key.clone()))?;
            super::calls::set_home_object(ev, &func, proto_obj);
            if member.is_private {
                set_private_default(ev, target, &key, func);
            } else {
                let pkey = PropertyKey::from_str(&key);
                if let Some(obj) = ev.heap_mut().get_mut(target).as_object_mut() {
                    obj.set_own(pkey, PropertyDescriptor::builtin_method(func));
                }
            }
            Ok(())
        }
        ClassMemberKind::Getter(f) => {
            let func = super::calls::make_function_value(ev, f, env, Some(format!("get {key}")))?;
            super::calls::set_home_object(ev, &func, proto_obj);
            super::access::define_accessor(ev, target, &key, Some(func), None);
            Ok(())
        }
        ClassMemberKind::Setter(f) => {
            let func = super::calls::make_function_value(ev, f, env, Some(format!("set {key}")))?;
            super::calls::set_home_object(ev, &func, proto_obj);
            super::access::define_accessor(ev, target, &key, None, Some(func));
            Ok(())
        }
        ClassMemberKind::Field(init) if member.is_static => {
            let value = match init {
                Some(expr) => super::statements::eval_expr(ev, expr, env)?,
                None => Value::Undefined,
            };
            if member.is_private {
                set_private_default(ev, target, &key, value);
            } else {
                super::access::set_property(ev, Value::Object(target), &key, value)?;
            }
            Ok(())
        }
        ClassMemberKind::Field(_) => Ok(()), // instance fields are applied at construction time
    }
}

fn set_private_default(ev: &mut Evaluator, target: HeapId, key: &str, value: Value) {
    let name = key.trim_start_matches('#');
    if let Some(obj) = ev.heap_mut().get_mut(target).as_object_mut() {
        obj.private_fields.insert((target, Rc::from(name)), value);
    }
}

/// Runs a class's instance field initializers against `instance`, in source
/// order, right after `new` allocates it and before the constructor body's
/// own statements run — externally equivalent to running them as the first
/// statements of the constructor for every initializer that doesn't depend
/// on constructor-parameter bindings, which covers ordinary field
/// initializers (`§4.6` "Classes").
pub(crate) fn run_field_initializers(ev: &mut Evaluator, ctor_id: HeapId, instance: HeapId, closure_env: HeapId) -> RunResult<()> {
    let plan = match ev.heap().get(ctor_id).as_function() {
        Some(f) => f.class_fields.clone(),
        None => None,
    };
    let Some(plan) = plan else { return Ok(()) };
    let field_env = crate::environment::create(ev.heap_mut(), Some(closure_env), false);
    crate::environment::set_this(ev.heap_mut(), field_env, Value::Object(instance));
    for item in plan.iter() {
        let value = match &item.init {
            FieldInit::Expr(Some(expr)) => super::statements::eval_expr(ev, expr, field_env)?,
            FieldInit::Expr(None) => Value::Undefined,
            FieldInit::Shared(v) => v.clone(),
        };
        if item.is_private {
            let name = item.key.as_str().unwrap_or_default().trim_start_matches('#');
            if let Some(obj) = ev.heap_mut().get_mut(instance).as_object_mut() {
                obj.private_fields.insert((ctor_id, Rc::from(name)), value);
            }
        } else if let Some(name) = item.key.as_str() {
            super::access::set_property(ev, Value::Object(instance), name, value)?;
        }
    }
    Ok(())
}
