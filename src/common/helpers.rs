use anyhow::Error;

pub fn print_error_chain(err: &Error) {
    // Main context first, then one line per cause
    let error_message = err
        .chain()
        .enumerate()
        .map(|(index, cause)| {
            if index == 0 {
                cause.to_string()
            } else {
                format!("       └> {}", cause)
            }
        })
        .collect::<Vec<String>>()
        .join("\n");

    error!("{}", error_message);
}

/// Shortens a JSON value for log lines.
pub fn preview_value(value: &serde_json::Value, max_chars: usize) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_chars {
        rendered
    } else {
        let mut preview: String = rendered.chars().take(max_chars).collect();
        preview.push('…');
        preview
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_preview_value_truncates_long_documents() {
        assert_eq!(preview_value(&json!("G1"), 10), "\"G1\"");
        assert_eq!(preview_value(&json!({"id": "abcdef"}), 5), "{\"id\"…");
    }
}
