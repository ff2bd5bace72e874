//! Same-document parameter reference resolution.

use crate::types::{Document, Parameter};
use tracing::{debug, warn};

/// Resolve a `#/components/parameters/<key>` reference.
///
/// A parameter without a reference is returned as is. A resolvable reference
/// yields a copy of the component entry, replacing the stub entirely. Any other
/// reference (wrong shape, no components table, unknown key) returns the stub
/// unchanged; its empty location keeps it out of generated schemas.
pub fn resolve(param: &Parameter, doc: &Document) -> Parameter {
    if !param.is_reference() {
        return param.clone();
    }

    let Some(components) = doc.components.as_ref() else {
        warn!("Cannot resolve {}: document has no components", param.reference);
        return param.clone();
    };

    let parts: Vec<&str> = param.reference.split('/').collect();
    match parts.as_slice() {
        ["#", "components", "parameters", key] => match components.parameters.get(*key) {
            Some(target) => {
                debug!("Resolved {} to parameter '{}'", param.reference, target.name);
                target.clone()
            }
            None => {
                warn!("Unresolved parameter reference: {}", param.reference);
                param.clone()
            }
        },
        _ => {
            warn!("Unsupported parameter reference: {}", param.reference);
            param.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Components, ParameterLocation, SchemaNode};

    fn doc_with_components() -> Document {
        let mut components = Components::default();
        components.parameters.insert(
            "offsetParam".to_string(),
            Parameter {
                name: "offset".to_string(),
                location: ParameterLocation::Query,
                description: "The number of items to skip before starting to collect the result set."
                    .to_string(),
                required: false,
                schema: Some(SchemaNode::of_type("integer")),
                reference: String::new(),
            },
        );
        components.parameters.insert(
            "limitParam".to_string(),
            Parameter {
                name: "limit".to_string(),
                location: ParameterLocation::Query,
                description: "The numbers of items to return.".to_string(),
                required: false,
                schema: Some(SchemaNode::of_type("integer")),
                reference: String::new(),
            },
        );
        Document {
            components: Some(components),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_valid_reference() {
        let doc = doc_with_components();
        let resolved = resolve(&Parameter::reference("#/components/parameters/offsetParam"), &doc);

        let expected = &doc.components.as_ref().unwrap().parameters["offsetParam"];
        assert_eq!(&resolved, expected);
        assert_eq!(resolved.name, "offset");
        assert_eq!(resolved.location, ParameterLocation::Query);
        assert!(!resolved.is_reference());
    }

    #[test]
    fn test_resolve_replaces_stub_fields() {
        let doc = doc_with_components();
        let stub = Parameter {
            name: "ignored".to_string(),
            required: true,
            ..Parameter::reference("#/components/parameters/limitParam")
        };

        let resolved = resolve(&stub, &doc);
        assert_eq!(resolved.name, "limit");
        assert!(!resolved.required);
    }

    #[test]
    fn test_unresolvable_references_pass_through() {
        let doc = doc_with_components();
        for reference in [
            "#/components/parameters/nonExistentParam",
            "#/components/schemas/offsetParam",
            "#/components/parameters/offsetParam/extra",
            "other.yaml#/components/parameters/offsetParam",
            "offsetParam",
        ] {
            let stub = Parameter::reference(reference);
            assert_eq!(resolve(&stub, &doc), stub, "reference {reference}");
        }
    }

    #[test]
    fn test_missing_components_pass_through() {
        let stub = Parameter::reference("#/components/parameters/offsetParam");
        assert_eq!(resolve(&stub, &Document::default()), stub);
    }

    #[test]
    fn test_plain_parameter_unchanged() {
        let param = Parameter {
            name: "directParam".to_string(),
            location: ParameterLocation::Query,
            ..Default::default()
        };
        assert_eq!(resolve(&param, &doc_with_components()), param);
    }
}
