//! Plain-text projection of RTF documents.
//!
//! Enough of the format to recover readable text: groups, control words,
//! `\'hh` and `\uN` escapes. Destination groups (font tables, pictures,
//! `{\*...}`) are skipped.

const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "xmlnstbl",
    "themedata",
    "latentstyles",
    "datastore",
];

#[derive(Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Characters to drop after a `\uN` escape.
    uc: usize,
}

/// Returns `None` for bytes that do not start like an RTF document.
pub fn plain_text(bytes: &[u8]) -> Option<String> {
    let trimmed = bytes.iter().position(|b| !b.is_ascii_whitespace()).map(|i| &bytes[i..])?;
    if !trimmed.starts_with(b"{\\rtf") {
        return None;
    }

    let mut out = String::new();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState { skip: false, uc: 1 };
    let mut pending_skip = 0usize;
    let mut i = 0usize;

    while i < trimmed.len() {
        let b = trimmed[i];
        match b {
            b'{' => {
                stack.push(state);
                i += 1;
            }
            b'}' => {
                state = stack.pop().unwrap_or(state);
                i += 1;
            }
            b'\\' => {
                i += 1;
                let Some(&next) = trimmed.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < trimmed.len() && trimmed[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word = String::from_utf8_lossy(&trimmed[start..i]).into_owned();
                    let num_start = i;
                    if i < trimmed.len() && (trimmed[i] == b'-' || trimmed[i].is_ascii_digit()) {
                        i += 1;
                        while i < trimmed.len() && trimmed[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                    let param: Option<i32> = std::str::from_utf8(&trimmed[num_start..i])
                        .ok()
                        .and_then(|s| s.parse().ok());
                    if i < trimmed.len() && trimmed[i] == b' ' {
                        i += 1;
                    }

                    if SKIPPED_DESTINATIONS.contains(&word.as_str()) {
                        state.skip = true;
                        continue;
                    }
                    if state.skip {
                        continue;
                    }
                    match word.as_str() {
                        "par" | "line" | "sect" | "page" => out.push('\n'),
                        "tab" => out.push('\t'),
                        "emdash" => out.push('\u{2014}'),
                        "endash" => out.push('\u{2013}'),
                        "bullet" => out.push('\u{2022}'),
                        "lquote" => out.push('\u{2018}'),
                        "rquote" => out.push('\u{2019}'),
                        "ldblquote" => out.push('\u{201C}'),
                        "rdblquote" => out.push('\u{201D}'),
                        "uc" => state.uc = param.unwrap_or(1).max(0) as usize,
                        "u" => {
                            if let Some(code) = param {
                                let code = if code < 0 { code + 65536 } else { code };
                                if let Some(ch) = char::from_u32(code as u32) {
                                    out.push(ch);
                                }
                                pending_skip = state.uc;
                            }
                        }
                        _ => {}
                    }
                } else {
                    i += 1;
                    match next {
                        b'*' => state.skip = true,
                        b'\'' => {
                            let hex = trimmed.get(i..i + 2).and_then(|h| std::str::from_utf8(h).ok());
                            i += 2;
                            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                                if state.skip {
                                    continue;
                                }
                                if pending_skip > 0 {
                                    pending_skip -= 1;
                                } else {
                                    // latin-1 is close enough to cp1252 for titles
                                    out.push(byte as char);
                                }
                            }
                        }
                        b'\\' | b'{' | b'}' if !state.skip => out.push(next as char),
                        b'~' if !state.skip => out.push('\u{00A0}'),
                        b'\n' | b'\r' if !state.skip => out.push('\n'),
                        _ => {}
                    }
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                i += 1;
                if state.skip {
                    continue;
                }
                if pending_skip > 0 {
                    pending_skip -= 1;
                    continue;
                }
                // Multi-byte utf-8 runs are copied through as-is.
                if b.is_ascii() {
                    out.push(b as char);
                } else {
                    let start = i - 1;
                    let mut end = i;
                    while end < trimmed.len() && !trimmed[end].is_ascii() {
                        end += 1;
                    }
                    out.push_str(&String::from_utf8_lossy(&trimmed[start..end]));
                    i = end;
                }
            }
        }
    }
    Some(out)
}
