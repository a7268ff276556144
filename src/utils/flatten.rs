use serde_json::{ Map, Value };

/// Flattens nested objects into a single level, joining keys with `.`.
///
/// Arrays, `null` and scalars are leaves and are copied as they are. The input is not
/// modified.
pub fn flatten_object(object: &Map<String, Value>) -> Map<String, Value> {
    let mut result = Map::new();
    flatten_into(object, "", &mut result);
    result
}

fn flatten_into(object: &Map<String, Value>, parent_key: &str, result: &mut Map<String, Value>) {
    for (key, value) in object {
        let full_key = if parent_key.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", parent_key, key)
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &full_key, result),
            leaf => {
                result.insert(full_key, leaf.clone());
            }
        }
    }
}
