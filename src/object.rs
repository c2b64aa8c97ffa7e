use std::cell::RefCell;
use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::class::Class;
use crate::error::EmbedError;
use crate::promote::Binding;
use crate::value::Value;

/// A shared handle to a composed object instance.
///
/// Cloning the handle aliases the instance; use [`Object::is`] for reference
/// identity. Attribute access always routes through the embedded object
/// *currently* stored in a slot, so reassigning a slot immediately redirects
/// promoted reads, writes, and calls.
#[derive(Clone)]
pub struct Object {
    inner: Rc<RefCell<ObjectInner>>,
}

struct ObjectInner {
    class: Class,
    values: IndexMap<String, Value>,
    adhoc: IndexMap<String, Value>,
}

impl Object {
    pub(crate) fn from_parts(class: Class, values: IndexMap<String, Value>) -> Self {
        Object {
            inner: Rc::new(RefCell::new(ObjectInner {
                class,
                values,
                adhoc: IndexMap::new(),
            })),
        }
    }

    /// The class this object was instantiated from.
    pub fn class(&self) -> Class {
        self.inner.borrow().class.clone()
    }

    /// The class name, as it appears in error messages.
    pub fn class_name(&self) -> String {
        self.inner.borrow().class.name().to_string()
    }

    /// Reference identity: both handles alias the same instance.
    pub fn is(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads an attribute.
    ///
    /// Ad-hoc attributes, declared fields, and local properties are served
    /// first; otherwise the promotion table routes the read through the
    /// embedded object currently held by the bound slot. An ambiguous name
    /// fails regardless of what any embedded object holds.
    pub fn attr(&self, name: &str) -> Result<Value, EmbedError> {
        {
            let inner = self.inner.borrow();
            if let Some(value) = inner.adhoc.get(name) {
                return Ok(value.clone());
            }
            if let Some(value) = inner.values.get(name) {
                return Ok(value.clone());
            }
        }
        let class = self.class();
        if let Some(getter) = class.property(name) {
            return getter(self);
        }
        match class.binding(name) {
            Some(Binding::Routed { field }) => self.embedded(&field)?.attr(name),
            Some(Binding::Ambiguous) => Err(EmbedError::AmbiguousSelector(name.to_string())),
            None => Err(self.missing(name)),
        }
    }

    /// Writes an attribute.
    ///
    /// Declared fields are set directly (running the field's converter,
    /// validator, and embedded type check). A promoted name is forwarded to
    /// the embedded object that declares it as a field, however deeply
    /// nested. A name no embedded object declares as a field — including
    /// promoted methods and properties, which are read/call-only — becomes
    /// an ad-hoc attribute on this object, unless the class is
    /// slots-restricted. Frozen classes reject every write before any state
    /// changes.
    pub fn set_attr(&self, name: &str, value: Value) -> Result<(), EmbedError> {
        let class = self.class();
        if class.options().frozen {
            return Err(EmbedError::FrozenObject(class.name().to_string()));
        }
        if let Some(field) = class.field(name) {
            let checked = class.check_field_value(name, field, value)?;
            self.inner.borrow_mut().values.insert(name.to_string(), checked);
            return Ok(());
        }
        match class.binding(name) {
            Some(Binding::Routed { field }) if class.promotes_field(name) => {
                self.embedded(&field)?.set_attr(name, value)
            }
            Some(Binding::Ambiguous) => Err(EmbedError::AmbiguousSelector(name.to_string())),
            _ if class.options().slots => Err(self.missing(name)),
            _ => {
                trace!(class = class.name(), attribute = name, "ad-hoc attribute");
                self.inner.borrow_mut().adhoc.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Invokes a method: local methods first, then promoted ones. A promoted
    /// call runs with the owning embedded object as the receiver.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EmbedError> {
        let class = self.class();
        if let Some(method) = class.method(name) {
            return method(self, args);
        }
        match class.binding(name) {
            Some(Binding::Routed { field }) => self.embedded(&field)?.call(name, args),
            Some(Binding::Ambiguous) => Err(EmbedError::AmbiguousSelector(name.to_string())),
            None => Err(self.missing(name)),
        }
    }

    /// The generated representation: `Name(field=value, ..)` over
    /// repr-flagged fields, or `<Name object>` when repr generation is off.
    pub fn repr(&self) -> String {
        let inner = self.inner.borrow();
        let class = &inner.class;
        if !class.options().repr {
            return format!("<{} object>", class.name());
        }
        let mut out = String::new();
        out.push_str(class.name());
        out.push('(');
        let mut first = true;
        for (name, field) in class.fields() {
            if !field.repr {
                continue;
            }
            if let Some(value) = inner.values.get(name) {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                let _ = write!(out, "{name}={value:?}");
            }
        }
        out.push(')');
        out
    }

    fn embedded(&self, field: &str) -> Result<Object, EmbedError> {
        match self.inner.borrow().values.get(field) {
            Some(Value::Object(obj)) => Ok(obj.clone()),
            _ => Err(self.missing(field)),
        }
    }

    fn missing(&self, name: &str) -> EmbedError {
        EmbedError::MissingAttribute {
            class: self.class_name(),
            name: name.to_string(),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = self.class();
        if class.options().str {
            f.write_str(&self.repr())
        } else {
            write!(f, "<{} object>", class.name())
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Object) -> bool {
        if self.is(other) {
            return true;
        }
        let a = self.inner.borrow();
        let b = other.inner.borrow();
        if !a.class.is(&b.class) || !a.class.options().eq {
            return false;
        }
        a.class
            .fields()
            .iter()
            .filter(|(_, field)| field.eq)
            .all(|(name, _)| a.values.get(name) == b.values.get(name))
    }
}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let inner = self.inner.borrow();
        if inner.class.options().hash {
            inner.class.name().hash(state);
            for (name, field) in inner.class.fields() {
                if !field.hash {
                    continue;
                }
                if let Some(value) = inner.values.get(name) {
                    value.hash(state);
                }
            }
        } else {
            (Rc::as_ptr(&self.inner) as usize).hash(state);
        }
    }
}
