/// Rough estimate: GPT-style token ≈ 4 chars, rounded up.
pub fn estimate_tokens(total_chars: usize) -> usize {
    total_chars.div_ceil(4)
}

/// `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes < 1024 {
        return format!("{} B", size_bytes);
    }
    let kb = size_bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{:.1} KB", kb);
    }
    format!("{:.1} MB", kb / 1024.0)
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
