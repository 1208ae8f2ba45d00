/// Best-effort isolation of the JSON object inside a completion.
///
/// Takes everything from the first `{` through the last `}`. Prose around the
/// payload is dropped; braces inside it are not balanced or checked. Text with
/// no `{` yields an empty candidate, which then fails to parse.
pub fn extract_json_candidate(raw: &str) -> &str {
    let Some(start) = raw.find('{') else {
        return "";
    };

    match raw.rfind('}') {
        Some(end) if end > start => &raw[start..=end],
        _ => &raw[start..],
    }
}
