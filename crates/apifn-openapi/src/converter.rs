//! Conversion of OpenAPI operations into model-callable function definitions.

use crate::resolver::resolve;
use crate::types::{Document, FunctionDefinition, ParameterLocation, SchemaNode};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Argument name under which a request body is exposed to the model.
pub const REQUEST_BODY_ARG: &str = "requestBody";

/// Convert every operation in the document into a function definition keyed
/// by its generated name.
///
/// Conversion never fails. Parameters outside the path and query are
/// dropped, and when two operations generate the same name the later one
/// (in document order) replaces the earlier.
pub fn convert(doc: &Document) -> HashMap<String, FunctionDefinition> {
    let mut functions = HashMap::new();

    for (path, item) in &doc.paths {
        for (method, op) in item.operations() {
            let name = generate_name(method, path);
            let mut parameters = SchemaNode::object();
            let mut path_params = Vec::new();
            let mut query_params = Vec::new();

            for declared in &op.parameters {
                let param = resolve(declared, doc);

                let bucket = match param.location {
                    ParameterLocation::Path => &mut path_params,
                    ParameterLocation::Query => &mut query_params,
                    _ => {
                        debug!(
                            "Skipping parameter '{}' ({}) on {} {}",
                            param.name, param.location, method, path
                        );
                        continue;
                    }
                };

                let mut property = convert_schema(param.schema.as_ref());
                property.description = param.description.clone();
                insert_property(&mut parameters, &param.name, property);
                bucket.push(param.name.clone());

                if param.required {
                    parameters.required.push(param.name.clone());
                }
            }

            if let Some(schema) = op
                .request_body
                .as_ref()
                .and_then(|body| body.preferred_schema())
            {
                insert_property(&mut parameters, REQUEST_BODY_ARG, convert_schema(Some(schema)));
            }

            debug!("Generated function '{}' for {} {}", name, method, path);

            let function = FunctionDefinition {
                name: name.clone(),
                description: op.composed_description(),
                parameters,
                method: method.to_string(),
                path: path.clone(),
                path_params,
                query_params,
            };

            if functions.insert(name.clone(), function).is_some() {
                warn!("Function name '{}' generated twice; keeping {} {}", name, method, path);
            }
        }
    }

    info!("Converted {} functions", functions.len());
    functions
}

/// Build a function name from an HTTP method and path template.
///
/// `/` becomes `_`, braces are dropped, the method is prefixed and the
/// whole string is lower-cased: `("GET", "/pets/{id}")` gives `get_pets_id`.
pub fn generate_name(method: &str, path: &str) -> String {
    let path: String = path
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    format!("{}{}", method, path).to_lowercase()
}

/// Copy the type, description, nested properties and required list of a
/// schema node. A missing schema becomes a plain `string`.
fn convert_schema(schema: Option<&SchemaNode>) -> SchemaNode {
    let Some(schema) = schema else {
        return SchemaNode::of_type("string");
    };

    let mut node = SchemaNode {
        schema_type: schema.schema_type.clone(),
        description: schema.description.clone(),
        ..Default::default()
    };

    if let Some(properties) = &schema.properties {
        node.properties = Some(
            properties
                .iter()
                .map(|(name, sub)| (name.clone(), convert_schema(Some(sub))))
                .collect::<IndexMap<_, _>>(),
        );
        node.required = schema.required.clone();
    }

    node
}

fn insert_property(parameters: &mut SchemaNode, name: &str, property: SchemaNode) {
    parameters
        .properties
        .get_or_insert_with(IndexMap::new)
        .insert(name.to_string(), property);
}
