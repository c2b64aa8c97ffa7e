use thiserror::Error;

/// Errors raised by construction and attribute routing.
///
/// All errors are returned synchronously to the caller. Nothing is retried
/// or recovered internally; this is a pure library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    /// The name is neither a declared field nor resolvable through any
    /// embedded object.
    #[error("'{class}' object has no attribute '{name}'")]
    MissingAttribute { class: String, name: String },

    /// The name is promoted by two or more embedded fields with no local
    /// override, so there is no single object to route to.
    #[error("ambiguous selector '{0}'")]
    AmbiguousSelector(String),

    /// Write attempted on an instance of a frozen class.
    #[error("cannot assign attribute on frozen '{0}' object")]
    FrozenObject(String),

    /// The value supplied for an embedded slot is not an instance of the
    /// declared embedded class.
    #[error("type mismatch for field '{field}': expected '{expected}' instance, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Constructor called without a value for a required field.
    #[error("'{class}' missing argument for required field '{field}'")]
    MissingArgument { class: String, field: String },

    /// Constructor called with more positional arguments than the class
    /// accepts.
    #[error("'{class}' takes at most {expected} arguments, got {given}")]
    TooManyArguments {
        class: String,
        expected: usize,
        given: usize,
    },

    /// A validator rejected the value supplied for a field.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attribute_message() {
        let err = EmbedError::MissingAttribute {
            class: "Ferrari".to_string(),
            name: "nonexistent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'Ferrari' object has no attribute 'nonexistent'"
        );
    }

    #[test]
    fn ambiguous_selector_message() {
        let err = EmbedError::AmbiguousSelector("x".to_string());
        assert_eq!(err.to_string(), "ambiguous selector 'x'");
    }

    #[test]
    fn type_mismatch_names_the_field() {
        let err = EmbedError::TypeMismatch {
            field: "car".to_string(),
            expected: "Car".to_string(),
            actual: "int".to_string(),
        };
        assert!(err.to_string().contains("'car'"));
        assert!(err.to_string().contains("'Car'"));
    }
}
