const MAX_LOGGED_CHARS: usize = 200;

/// Escapes control characters and caps length so user-supplied text
/// (titles, usernames, ids from paths) cannot forge or flood log lines.
pub fn sanitize_for_log(input: &str) -> String {
    let mut result = String::with_capacity(input.len().min(MAX_LOGGED_CHARS + 16));

    for (count, ch) in input.chars().enumerate() {
        if count == MAX_LOGGED_CHARS {
            result.push_str("... [truncated]");
            break;
        }
        match ch {
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            c if c.is_control() => result.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => result.push(c),
        }
    }

    result
}

pub fn sanitize_log_value<T: std::fmt::Display>(value: T) -> String {
    sanitize_for_log(&value.to_string())
}
