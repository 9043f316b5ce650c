use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keywords schemars emits that OpenAI strict mode rejects.
const UNSUPPORTED_KEYWORDS: &[&str] = &["$schema", "format", "uniqueItems", "minimum", "maximum", "default"];

/// Types usable as an OpenAI structured-output target.
///
/// Implemented for every `JsonSchema + DeserializeOwned` type. Strict mode
/// requires `additionalProperties: false` and every property listed in
/// `required` on each object, with no `$ref` indirection, so the generated
/// schema is normalized into that shape.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        let root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = root
            .get("definitions")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let mut schema = normalize(root, &definitions);
        if let Value::Object(map) = &mut schema {
            map.remove("definitions");
        }
        schema
    }

    fn schema_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite one schema node: resolve refs, unwrap single `allOf`, close
/// objects, drop unsupported keywords, and recurse into subschemas.
fn normalize(value: Value, definitions: &Value) -> Value {
    let mut map = match value {
        Value::Object(map) => map,
        Value::Array(items) => {
            return Value::Array(
                items
                    .into_iter()
                    .map(|item| normalize(item, definitions))
                    .collect(),
            )
        }
        other => return other,
    };

    if let Some(Value::String(path)) = map.get("$ref") {
        let name = path.trim_start_matches("#/definitions/");
        if let Some(def) = definitions.get(name) {
            return normalize(def.clone(), definitions);
        }
    }

    if let Some(Value::Array(all_of)) = map.get("allOf") {
        if all_of.len() == 1 {
            return normalize(all_of[0].clone(), definitions);
        }
    }

    for keyword in UNSUPPORTED_KEYWORDS {
        map.remove(*keyword);
    }

    if let Some(Value::Object(props)) = map.remove("properties") {
        let required: Vec<Value> = props.keys().cloned().map(Value::String).collect();
        let props: Map<String, Value> = props
            .into_iter()
            .map(|(name, schema)| (name, normalize(schema, definitions)))
            .collect();
        map.insert("properties".to_string(), Value::Object(props));
        map.insert("required".to_string(), Value::Array(required));
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    } else if map.get("type") == Some(&Value::String("object".to_string())) {
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    for key in ["items", "anyOf", "oneOf", "allOf"] {
        if let Some(sub) = map.remove(key) {
            map.insert(key.to_string(), normalize(sub, definitions));
        }
    }

    Value::Object(map)
}
