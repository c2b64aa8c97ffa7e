use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::EmbedError;
use crate::field::Field;
use crate::object::Object;
use crate::promote::{Binding, PromotionTable};
use crate::value::Value;

/// A method registered on a class; receives the object it was invoked on.
pub type Method = Rc<dyn Fn(&Object, &[Value]) -> Result<Value, EmbedError>>;

/// A computed read-only attribute.
pub type Getter = Rc<dyn Fn(&Object) -> Result<Value, EmbedError>>;

/// Class-level generation options.
#[derive(Clone, Debug)]
pub struct ClassOptions {
    /// Generate a repr of the form `Name(field=value, ..)`.
    pub repr: bool,
    /// Compare instances by eq-flagged field values instead of identity.
    pub eq: bool,
    /// Hash instances by hash-flagged field values instead of identity.
    pub hash: bool,
    /// Accept positional constructor arguments for init-flagged fields.
    pub init: bool,
    /// Fixed layout: forbid ad-hoc attributes after construction.
    pub slots: bool,
    /// Forbid all attribute writes after construction.
    pub frozen: bool,
    /// Use the repr form for `Display` as well.
    pub str: bool,
}

impl Default for ClassOptions {
    fn default() -> Self {
        ClassOptions {
            repr: true,
            eq: true,
            hash: true,
            init: true,
            slots: false,
            frozen: false,
            str: false,
        }
    }
}

/// Registers a class: fields, methods, properties, and options.
///
/// Building is the one-time registration step. The promotion table is
/// computed here, so embedded classes must be built before the classes that
/// embed them.
pub struct ClassBuilder {
    name: String,
    options: ClassOptions,
    fields: IndexMap<String, Field>,
    methods: IndexMap<String, Method>,
    properties: IndexMap<String, Getter>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            name: name.into(),
            options: ClassOptions::default(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }

    pub fn repr(mut self, on: bool) -> Self {
        self.options.repr = on;
        self
    }

    pub fn eq(mut self, on: bool) -> Self {
        self.options.eq = on;
        self
    }

    pub fn hash(mut self, on: bool) -> Self {
        self.options.hash = on;
        self
    }

    pub fn init(mut self, on: bool) -> Self {
        self.options.init = on;
        self
    }

    pub fn slots(mut self, on: bool) -> Self {
        self.options.slots = on;
        self
    }

    pub fn frozen(mut self, on: bool) -> Self {
        self.options.frozen = on;
        self
    }

    pub fn str(mut self, on: bool) -> Self {
        self.options.str = on;
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: ClassOptions) -> Self {
        self.options = options;
        self
    }

    /// Declares a field. Declaration order is the constructor argument order
    /// and the promotion scan order. Redeclaring a name replaces the earlier
    /// declaration but keeps its position.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Registers a method, invokable through [`Object::call`].
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Object, &[Value]) -> Result<Value, EmbedError> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Registers a computed read-only attribute, served by [`Object::attr`].
    pub fn property(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Object) -> Result<Value, EmbedError> + 'static,
    ) -> Self {
        self.properties.insert(name.into(), Rc::new(getter));
        self
    }

    /// Finalizes registration: computes the promotion table and returns the
    /// immutable class handle.
    pub fn build(self) -> Class {
        let promotions =
            PromotionTable::build(&self.name, &self.fields, &self.methods, &self.properties);
        debug!(
            class = %self.name,
            fields = self.fields.len(),
            promoted = promotions.len(),
            "registered class"
        );
        Class(Rc::new(ClassInner {
            name: self.name,
            options: self.options,
            fields: self.fields,
            methods: self.methods,
            properties: self.properties,
            promotions,
        }))
    }
}

/// An immutable, cheaply-cloneable class handle.
#[derive(Clone)]
pub struct Class(Rc<ClassInner>);

struct ClassInner {
    name: String,
    options: ClassOptions,
    fields: IndexMap<String, Field>,
    methods: IndexMap<String, Method>,
    properties: IndexMap<String, Getter>,
    promotions: PromotionTable,
}

impl Class {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn options(&self) -> &ClassOptions {
        &self.0.options
    }

    /// Identity comparison: both handles refer to the same registered class.
    pub fn is(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Metadata attached to a field declaration, if any.
    pub fn field_metadata(&self, field: &str, key: &str) -> Option<Value> {
        self.0.fields.get(field)?.metadata_value(key).cloned()
    }

    pub(crate) fn field(&self, name: &str) -> Option<&Field> {
        self.0.fields.get(name)
    }

    /// Whether a name ultimately reaches a declared field on some embedded
    /// object. Routed writes only follow such names; promoted methods and
    /// properties are read/call-only targets.
    pub(crate) fn promotes_field(&self, name: &str) -> bool {
        if self.0.fields.contains_key(name) {
            return true;
        }
        match self.0.promotions.get(name) {
            Some(Binding::Routed { field }) => self
                .0
                .fields
                .get(field)
                .and_then(|field| field.embed.as_ref())
                .is_some_and(|spec| spec.class.promotes_field(name)),
            _ => false,
        }
    }

    pub(crate) fn fields(&self) -> &IndexMap<String, Field> {
        &self.0.fields
    }

    pub(crate) fn method(&self, name: &str) -> Option<Method> {
        self.0.methods.get(name).cloned()
    }

    pub(crate) fn property(&self, name: &str) -> Option<Getter> {
        self.0.properties.get(name).cloned()
    }

    pub(crate) fn binding(&self, name: &str) -> Option<Binding> {
        self.0.promotions.get(name).cloned()
    }

    /// All externally-visible names: declared fields, methods, properties,
    /// and unambiguous promoted names. This is the promotion source set for
    /// classes embedding this one.
    pub(crate) fn visible_names(&self) -> IndexSet<&str> {
        let mut names: IndexSet<&str> = IndexSet::new();
        names.extend(self.0.fields.keys().map(String::as_str));
        names.extend(self.0.methods.keys().map(String::as_str));
        names.extend(self.0.properties.keys().map(String::as_str));
        names.extend(self.0.promotions.routed_names());
        names
    }

    /// Constructs an instance from positional arguments in declaration
    /// order. Missing arguments take field defaults; a required field
    /// without an argument is a construction error, as is a surplus
    /// argument. With `init` off the constructor accepts no arguments.
    pub fn instantiate(&self, args: Vec<Value>) -> Result<Object, EmbedError> {
        let accepted = if self.0.options.init {
            self.0.fields.values().filter(|field| field.init).count()
        } else {
            0
        };
        if args.len() > accepted {
            return Err(EmbedError::TooManyArguments {
                class: self.0.name.clone(),
                expected: accepted,
                given: args.len(),
            });
        }

        let mut supplied = args.into_iter();
        let mut values = IndexMap::new();
        for (name, field) in &self.0.fields {
            let takes_arg = self.0.options.init && field.init;
            let positional = if takes_arg { supplied.next() } else { None };
            let raw = match positional {
                Some(value) => value,
                None => field.default_value(&self.0.name, name)?,
            };
            let value = self.check_field_value(name, field, raw)?;
            values.insert(name.clone(), value);
        }
        Ok(Object::from_parts(self.clone(), values))
    }

    /// Runs the field pipeline on a candidate value: converter, then
    /// validator, then the embedded type check.
    pub(crate) fn check_field_value(
        &self,
        name: &str,
        field: &Field,
        value: Value,
    ) -> Result<Value, EmbedError> {
        let value = match &field.converter {
            Some(convert) => convert(value),
            None => value,
        };
        if let Some(validate) = &field.validator {
            validate(name, &value)?;
        }
        if let Some(spec) = &field.embed {
            let matches = value
                .as_object()
                .map(|obj| obj.class().is(&spec.class))
                .unwrap_or(false);
            if !matches {
                return Err(EmbedError::TypeMismatch {
                    field: name.to_string(),
                    expected: spec.class.name().to_string(),
                    actual: value.type_name(),
                });
            }
        }
        Ok(value)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.0.name)
            .field("fields", &self.0.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
