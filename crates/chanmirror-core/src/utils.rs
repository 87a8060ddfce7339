/// Length of `text` in UTF-16 code units (the unit entity offsets use).
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// UTF-16 offset of the UTF-8 byte offset `byte_offset` in `text`.
pub fn utf16_offset(text: &str, byte_offset: usize) -> usize {
    text.char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .map(|(_, c)| c.len_utf16())
        .sum()
}

/// Short single-line preview for logs.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}...")
}
