//! Shared utility functions

/// Truncate a string to at most `max_chars` characters. No marker is appended.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Whether `s` holds at least `min_chars` characters, without counting past it
pub fn has_min_chars(s: &str, min_chars: usize) -> bool {
    s.chars().take(min_chars).count() >= min_chars
}

/// Join a base URL and a relative path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Swap a segment file name's extension for `.jsonl`
///
/// `.warc.gz` is treated as a single extension.
pub fn jsonl_name(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".warc.gz")
        .or_else(|| file_name.rsplit_once('.').map(|(stem, _)| stem))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name);
    format!("{}.jsonl", stem)
}

/// Human-readable byte count (binary units)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
