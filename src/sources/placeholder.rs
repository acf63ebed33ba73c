//! `${key}` placeholder expansion.
//!
//! Expansion is single-level: substituted text is not scanned again.
//! Placeholders that cannot be resolved are kept literally.

/// Replace every `${key}` in `input` with `lookup(key)` when it resolves.
pub fn expand<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = after[..end].trim();
                match lookup(key) {
                    Some(value) if !key.is_empty() => out.push_str(&value),
                    _ => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
