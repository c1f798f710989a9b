use serde_json::Value;

/// Remove object fields whose value is `null`, recursively.
///
/// Array elements are left in place so indices keep their meaning.
pub fn prune_null_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(prune_null_fields);
        }
        Value::Array(items) => items.iter_mut().for_each(prune_null_fields),
        _ => {}
    }
}

pub fn without_null_fields(value: &Value) -> Value {
    let mut cloned = value.clone();
    prune_null_fields(&mut cloned);
    cloned
}

#[cfg(test)]
mod tests {
    use super::without_null_fields;
    use serde_json::json;

    #[test]
    fn nested_nulls_are_removed_but_array_slots_kept() {
        let body = json!({
            "generationConfig": { "imageConfig": null, "temperature": 1 },
            "contents": [null, { "role": null }]
        });
        assert_eq!(
            without_null_fields(&body),
            json!({ "generationConfig": { "temperature": 1 }, "contents": [null, {}] })
        );
    }
}
