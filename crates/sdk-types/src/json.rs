use serde_json::Value;

/// Parse a JSON value out of model text that may carry markdown fences or
/// chatter around the payload.
///
/// Strict parsing is tried first; otherwise the first balanced object or
/// array (brackets inside string literals are ignored) is parsed.
pub fn parse_json_loose(s: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(s) {
        return Some(v);
    }
    let start = s.find(['{', '['])?;
    let end = balanced_end(&s.as_bytes()[start..])?;
    serde_json::from_str::<Value>(&s[start..start + end]).ok()
}

/// Length of the balanced bracket group at the head of `bytes`.
fn balanced_end(bytes: &[u8]) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_str = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_str {
            match (escape, b) {
                (true, _) => escape = false,
                (false, b'\\') => escape = true,
                (false, b'"') => in_str = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_str = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop()? != b {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::parse_json_loose;

    #[test]
    fn strict_object_parses() {
        let v = parse_json_loose(r#"{"shots":[]}"#).unwrap();
        assert!(v["shots"].is_array());
    }

    #[test]
    fn fenced_reply_parses() {
        let raw = "```json\n{\"shots\":[{\"description\":\"a } brace\"}]}\n```";
        let v = parse_json_loose(raw).unwrap();
        assert_eq!(v["shots"][0]["description"], "a } brace");
    }

    #[test]
    fn mismatched_brackets_fail() {
        assert!(parse_json_loose("noise {\"a\": [1}").is_none());
    }
}
