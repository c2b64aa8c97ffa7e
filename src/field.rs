use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::Class;
use crate::error::EmbedError;
use crate::value::Value;

/// Validates a candidate value for a field. Receives the field name so the
/// error can point at the offending declaration.
pub type Validator = Rc<dyn Fn(&str, &Value) -> Result<(), EmbedError>>;

/// Converts a supplied value before validation and storage.
pub type Converter = Rc<dyn Fn(Value) -> Value>;

/// Produces a fresh default value, run once per instantiation.
pub type DefaultFactory = Rc<dyn Fn() -> Result<Value, EmbedError>>;

#[derive(Clone)]
pub(crate) enum FieldDefault {
    Required,
    Value(Value),
    Factory(DefaultFactory),
}

/// Marks a field as embedded: carries the embedded class and the extra
/// promotable names listed on the declaration.
#[derive(Clone)]
pub(crate) struct EmbedSpec {
    pub(crate) class: Class,
    pub(crate) extras: Vec<String>,
}

/// A field declaration. Bound to a name by [`crate::ClassBuilder::field`];
/// declaration order is the constructor argument order and the promotion
/// scan order.
#[derive(Clone)]
pub struct Field {
    pub(crate) default: FieldDefault,
    pub(crate) embed: Option<EmbedSpec>,
    pub(crate) validator: Option<Validator>,
    pub(crate) converter: Option<Converter>,
    pub(crate) repr: bool,
    pub(crate) eq: bool,
    pub(crate) hash: bool,
    pub(crate) init: bool,
    pub(crate) metadata: IndexMap<String, Value>,
}

impl Field {
    fn base(default: FieldDefault) -> Self {
        Field {
            default,
            embed: None,
            validator: None,
            converter: None,
            repr: true,
            eq: true,
            hash: true,
            init: true,
            metadata: IndexMap::new(),
        }
    }

    /// A required field: instantiation fails unless a value is supplied.
    pub fn new() -> Self {
        Self::base(FieldDefault::Required)
    }

    /// A field with a fixed default value.
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self::base(FieldDefault::Value(value.into()))
    }

    /// A field whose default is produced by a factory on each instantiation,
    /// so instances never share a default by accident.
    pub fn with_factory(factory: impl Fn() -> Result<Value, EmbedError> + 'static) -> Self {
        Self::base(FieldDefault::Factory(Rc::new(factory)))
    }

    /// An embedded field holding an instance of `class`.
    ///
    /// Every externally-visible name of the embedded class is promoted onto
    /// the container, subject to the visibility and precedence rules. The
    /// default is a fresh default instance of the embedded class.
    pub fn embed(class: &Class) -> Self {
        let factory_class = class.clone();
        let mut field = Self::base(FieldDefault::Factory(Rc::new(move || {
            factory_class.instantiate(Vec::new()).map(Value::Object)
        })));
        field.embed = Some(EmbedSpec {
            class: class.clone(),
            extras: Vec::new(),
        });
        field
    }

    /// Extra promotable names for an embedded field, separated by spaces
    /// and/or commas. A name with a single leading underscore is promoted
    /// only if listed here. Has no effect on non-embedded fields.
    pub fn promote(mut self, names: &str) -> Self {
        if let Some(spec) = &mut self.embed {
            spec.extras = parse_promote_list(names);
        }
        self
    }

    pub fn validator(mut self, validate: impl Fn(&str, &Value) -> Result<(), EmbedError> + 'static) -> Self {
        self.validator = Some(Rc::new(validate));
        self
    }

    pub fn converter(mut self, convert: impl Fn(Value) -> Value + 'static) -> Self {
        self.converter = Some(Rc::new(convert));
        self
    }

    /// Include this field in the generated repr (default true).
    pub fn repr(mut self, on: bool) -> Self {
        self.repr = on;
        self
    }

    /// Include this field in derived equality (default true).
    pub fn eq(mut self, on: bool) -> Self {
        self.eq = on;
        self
    }

    /// Include this field in derived hashing (default true).
    pub fn hash(mut self, on: bool) -> Self {
        self.hash = on;
        self
    }

    /// Accept this field as a positional constructor argument (default
    /// true). Non-init fields always take their default.
    pub fn init(mut self, on: bool) -> Self {
        self.init = on;
        self
    }

    /// Attaches an arbitrary metadata entry to the declaration. The library
    /// never interprets metadata; it is carried for callers to inspect.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Looks up a metadata entry attached to the declaration.
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Whether this field is an embedded slot.
    pub fn is_embedded(&self) -> bool {
        self.embed.is_some()
    }

    pub(crate) fn default_value(&self, class: &str, name: &str) -> Result<Value, EmbedError> {
        match &self.default {
            FieldDefault::Required => Err(EmbedError::MissingArgument {
                class: class.to_string(),
                field: name.to_string(),
            }),
            FieldDefault::Value(value) => Ok(value.clone()),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}

/// A validator requiring the value to be an instance of `class`.
///
/// The same check runs implicitly for embedded slots; this form is for
/// plain fields that should hold a particular class of object.
pub fn instance_of(class: &Class) -> Validator {
    let class = class.clone();
    Rc::new(move |field, value| match value.as_object() {
        Some(obj) if obj.class().is(&class) => Ok(()),
        _ => Err(EmbedError::TypeMismatch {
            field: field.to_string(),
            expected: class.name().to_string(),
            actual: value.type_name(),
        }),
    })
}

fn parse_promote_list(names: &str) -> Vec<String> {
    names
        .split([',', ' '])
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
