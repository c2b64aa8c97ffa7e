use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::class::{Getter, Method};
use crate::field::Field;

/// How a promoted name resolves on a container class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Forward through the embedded object currently stored in this field.
    Routed { field: String },
    /// Claimed by two or more embedded fields with no local override; any
    /// access is an error.
    Ambiguous,
}

/// The per-class promotion table: promoted name to binding.
///
/// Computed once when the class is built and never mutated afterwards.
/// Which embedded object a routed name reaches is still resolved per access,
/// by reading the slot named in the binding.
#[derive(Default)]
pub(crate) struct PromotionTable {
    bindings: IndexMap<String, Binding>,
}

impl PromotionTable {
    pub(crate) fn build(
        class_name: &str,
        fields: &IndexMap<String, Field>,
        methods: &IndexMap<String, Method>,
        properties: &IndexMap<String, Getter>,
    ) -> Self {
        let mut local: IndexSet<&str> = IndexSet::new();
        local.extend(fields.keys().map(String::as_str));
        local.extend(methods.keys().map(String::as_str));
        local.extend(properties.keys().map(String::as_str));

        let mut bindings: IndexMap<String, Binding> = IndexMap::new();
        for (field_name, field) in fields {
            let Some(spec) = &field.embed else { continue };
            for name in spec.class.visible_names() {
                if !is_promotable(name, &spec.extras) {
                    continue;
                }
                // Local declarations always win: never replace.
                if local.contains(name) {
                    continue;
                }
                match bindings.get(name) {
                    None => {
                        bindings.insert(
                            name.to_string(),
                            Binding::Routed {
                                field: field_name.clone(),
                            },
                        );
                    }
                    Some(Binding::Routed { field }) if field != field_name => {
                        debug!(class = class_name, selector = name, "ambiguous selector");
                        bindings.insert(name.to_string(), Binding::Ambiguous);
                    }
                    Some(_) => {}
                }
            }
        }
        PromotionTable { bindings }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Names routed to exactly one embedded field. Ambiguous names are not
    /// re-exported to classes embedding this one.
    pub(crate) fn routed_names(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .filter(|(_, binding)| matches!(binding, Binding::Routed { .. }))
            .map(|(name, _)| name.as_str())
    }
}

/// The visibility rule: `__`-prefixed protocol hooks are always promotable,
/// single-underscore weakly-private names only when listed as extras, and
/// everything else by default.
pub(crate) fn is_promotable(name: &str, extras: &[String]) -> bool {
    if name.starts_with("__") {
        true
    } else if name.starts_with('_') {
        extras.iter().any(|extra| extra == name)
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Class, ClassBuilder};
    use crate::value::Value;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn class_with_fields(name: &str, fields: &[&str]) -> Class {
        let mut builder = ClassBuilder::new(name);
        for field in fields {
            builder = builder.field(*field, Field::with_default(0i64));
        }
        builder.build()
    }

    #[test]
    fn promotable_names() {
        assert!(is_promotable("talk", &[]));
        assert!(is_promotable("__dunder__", &[]));
        assert!(!is_promotable("_sunder", &[]));
        assert!(is_promotable("_sunder", &["_sunder".to_string()]));
        assert!(!is_promotable("_other", &["_sunder".to_string()]));
    }

    #[test]
    fn routes_embedded_names() {
        let inner = class_with_fields("Inner", &["x", "y"]);
        let outer = ClassBuilder::new("Outer")
            .field("inner", Field::embed(&inner))
            .build();

        assert_eq!(
            outer.binding("x"),
            Some(Binding::Routed {
                field: "inner".to_string()
            })
        );
        assert_eq!(
            outer.binding("y"),
            Some(Binding::Routed {
                field: "inner".to_string()
            })
        );
        assert_eq!(outer.binding("inner"), None);
    }

    #[test]
    fn local_declaration_wins() {
        let inner = class_with_fields("Inner", &["x"]);
        let outer = ClassBuilder::new("Outer")
            .field("inner", Field::embed(&inner))
            .field("x", Field::with_default(1i64))
            .build();

        assert_eq!(outer.binding("x"), None);
    }

    #[test]
    fn double_claim_is_ambiguous() {
        let a = class_with_fields("A", &["x"]);
        let b = class_with_fields("B", &["x"]);
        let outer = ClassBuilder::new("Outer")
            .field("a", Field::embed(&a))
            .field("b", Field::embed(&b))
            .build();

        assert_eq!(outer.binding("x"), Some(Binding::Ambiguous));
    }

    #[test]
    fn weakly_private_names_need_listing() {
        let inner = class_with_fields("Inner", &["_secret", "open"]);

        let closed = ClassBuilder::new("Closed")
            .field("inner", Field::embed(&inner))
            .build();
        assert_eq!(closed.binding("_secret"), None);
        assert!(closed.binding("open").is_some());

        let listed = ClassBuilder::new("Listed")
            .field("inner", Field::embed(&inner).promote("_secret"))
            .build();
        assert!(listed.binding("_secret").is_some());
    }

    #[test]
    fn protocol_hooks_promote_without_listing() {
        let inner = ClassBuilder::new("Inner")
            .method("__hook__", |_obj, _args| Ok(Value::Str("hook".to_string())))
            .build();
        let outer = ClassBuilder::new("Outer")
            .field("inner", Field::embed(&inner))
            .build();

        assert_eq!(
            outer.binding("__hook__"),
            Some(Binding::Routed {
                field: "inner".to_string()
            })
        );
    }

    #[test]
    fn nested_promotion_is_transitive() {
        let c = class_with_fields("C", &["d"]);
        let b = ClassBuilder::new("B").field("c", Field::embed(&c)).build();
        let a = ClassBuilder::new("A").field("b", Field::embed(&b)).build();

        // B exposes both its own field and C's promoted field.
        assert_eq!(
            a.binding("c"),
            Some(Binding::Routed {
                field: "b".to_string()
            })
        );
        assert_eq!(
            a.binding("d"),
            Some(Binding::Routed {
                field: "b".to_string()
            })
        );
    }

    #[test]
    fn ambiguous_names_are_not_reexported() {
        let a = class_with_fields("A", &["x"]);
        let b = class_with_fields("B", &["x"]);
        let mid = ClassBuilder::new("Mid")
            .field("a", Field::embed(&a))
            .field("b", Field::embed(&b))
            .build();
        let top = ClassBuilder::new("Top")
            .field("mid", Field::embed(&mid))
            .build();

        assert_eq!(mid.binding("x"), Some(Binding::Ambiguous));
        assert_eq!(top.binding("x"), None);
    }

    proptest! {
        #[test]
        fn table_honors_locality_and_ambiguity(
            names_a in proptest::collection::hash_set("[a-z]{1,6}", 0..6),
            names_b in proptest::collection::hash_set("[a-z]{1,6}", 0..6),
            locals in proptest::collection::hash_set("[a-z]{1,6}", 0..4),
        ) {
            // Slot names contain characters the generated names cannot.
            let a_fields: Vec<&str> = names_a.iter().map(String::as_str).collect();
            let b_fields: Vec<&str> = names_b.iter().map(String::as_str).collect();
            let a = class_with_fields("A", &a_fields);
            let b = class_with_fields("B", &b_fields);

            let mut builder = ClassBuilder::new("Container")
                .field("slot_0", Field::embed(&a))
                .field("slot_1", Field::embed(&b));
            for local in &locals {
                builder = builder.field(local.clone(), Field::with_default(0i64));
            }
            let container = builder.build();

            let everything: HashSet<&String> = names_a.union(&names_b).collect();
            for name in everything {
                let binding = container.binding(name);
                if locals.contains(name.as_str()) {
                    prop_assert_eq!(binding, None);
                } else if names_a.contains(name.as_str()) && names_b.contains(name.as_str()) {
                    prop_assert_eq!(binding, Some(Binding::Ambiguous));
                } else if names_a.contains(name.as_str()) {
                    prop_assert_eq!(binding, Some(Binding::Routed { field: "slot_0".to_string() }));
                } else {
                    prop_assert_eq!(binding, Some(Binding::Routed { field: "slot_1".to_string() }));
                }
            }
            for local in &locals {
                prop_assert_eq!(container.binding(local), None);
            }
        }
    }
}
