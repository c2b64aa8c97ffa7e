//! Amalgam composes objects by embedding: a container class declares slots
//! that hold other composed objects, and every externally-visible name of an
//! embedded object is promoted onto the container, with rules for
//! visibility, precedence, and ambiguity.
//!
//! Core concepts:
//! - **Class**: an immutable registration product holding the field table,
//!   method table, property table, and the promotion table
//! - **Field**: a declared slot with a default, optional validator and
//!   converter, and an optional embed marker
//! - **Object**: a shared instance handle; reads, writes, and calls route
//!   through the promotion table at access time
//! - **Value**: the dynamic value type, with reference semantics for objects
//!
//! Promotion bindings are computed once, when [`ClassBuilder::build`] runs.
//! Which embedded object serves a promoted name is resolved on every access
//! by reading the bound slot, so reassigning a slot immediately redirects
//! promoted reads, writes, and calls.
//!
//! # Example
//!
//! ```
//! use amalgam::{ClassBuilder, Field, Value};
//!
//! let car = ClassBuilder::new("Car")
//!     .field("wheel_count", Field::with_default(4i64))
//!     .method("number_of_wheels", |obj, _args| obj.attr("wheel_count"))
//!     .build();
//!
//! let ferrari = ClassBuilder::new("Ferrari")
//!     .field("car", Field::embed(&car))
//!     .build();
//!
//! let f = ferrari.instantiate(vec![]).unwrap();
//! assert_eq!(f.call("number_of_wheels", &[]).unwrap(), Value::Int(4));
//!
//! // Reassigning the slot redirects promoted access.
//! let six_wheeler = car.instantiate(vec![Value::Int(6)]).unwrap();
//! f.set_attr("car", Value::Object(six_wheeler)).unwrap();
//! assert_eq!(f.call("number_of_wheels", &[]).unwrap(), Value::Int(6));
//! ```
//!
//! # Precedence and ambiguity
//!
//! A name the container declares locally (field, method, or property) is
//! never replaced by a promotion. If two embedded slots would promote the
//! same name and there is no local override, the name is marked ambiguous at
//! registration time and every read or write raises
//! [`EmbedError::AmbiguousSelector`].
//!
//! # Visibility
//!
//! Names with a single leading underscore are weakly private: they are
//! promoted only when listed via [`Field::promote`]. Double-underscore
//! protocol hooks are promoted without restriction.
//!
//! Everything is single-threaded and synchronous; handles are `Rc`-based
//! and none of the types are `Send` or `Sync`.

mod class;
mod error;
mod field;
mod object;
mod promote;
mod value;

pub use class::{Class, ClassBuilder, ClassOptions, Getter, Method};
pub use error::EmbedError;
pub use field::{Converter, DefaultFactory, Field, Validator, instance_of};
pub use object::Object;
pub use value::Value;
