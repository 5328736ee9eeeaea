use std::ops::Range;

/// Locates a top-level field of a JSON object and returns the byte span of its value.
///
/// The scan only walks the outer object: nested objects, arrays and strings are
/// skipped over, never decoded. Scalar tokens are taken verbatim up to the next
/// delimiter, so payloads carrying non-standard literals (`0x12345`) still resolve.
/// Keys are compared after unescaping and a repeated key resolves to its last
/// occurrence, the same way `serde_json` reads the object.
pub fn find_top_level_field(payload: &[u8], name: &str) -> Option<Range<usize>> {
    let mut pos = skip_whitespace(payload, 0);
    if payload.get(pos) != Some(&b'{') {
        return None;
    }
    pos += 1;

    let mut found = None;
    loop {
        pos = skip_whitespace(payload, pos);
        if payload.get(pos) != Some(&b'"') {
            return found;
        }

        let Some(key_end) = skip_string(payload, pos) else {
            return found;
        };
        let key = &payload[pos..key_end];

        pos = skip_whitespace(payload, key_end);
        if payload.get(pos) != Some(&b':') {
            return found;
        }
        pos = skip_whitespace(payload, pos + 1);

        let value_start = pos;
        let Some(value_end) = skip_value(payload, pos) else {
            return found;
        };
        if key_matches(key, name) {
            found = Some(value_start..value_end);
        }

        pos = skip_whitespace(payload, value_end);
        match payload.get(pos) {
            Some(b',') => pos += 1,
            _ => return found,
        }
    }
}

// `quoted` includes both quotes.
fn key_matches(quoted: &[u8], name: &str) -> bool {
    let raw = &quoted[1..quoted.len() - 1];
    if !raw.contains(&b'\\') {
        return raw == name.as_bytes();
    }

    serde_json::from_slice::<String>(quoted).is_ok_and(|key| key == name)
}

/// Raw bytes of a top-level field value, e.g. `42` or `"abc"` for `id`.
pub fn read_top_level_field<'a>(payload: &'a [u8], name: &str) -> Option<&'a [u8]> {
    find_top_level_field(payload, name).map(|span| &payload[span])
}

/// Replaces the value of a top-level field in place. Returns false, leaving the
/// payload untouched, when the field is not present.
pub fn write_top_level_field(payload: &mut Vec<u8>, name: &str, value: &[u8]) -> bool {
    match find_top_level_field(payload, name) {
        Some(span) => {
            payload.splice(span, value.iter().copied());
            true
        }
        None => false,
    }
}

fn skip_whitespace(payload: &[u8], mut pos: usize) -> usize {
    while let Some(b' ' | b'\t' | b'\n' | b'\r') = payload.get(pos) {
        pos += 1;
    }
    pos
}

// `pos` points at the opening quote; returns the index just past the closing one.
fn skip_string(payload: &[u8], pos: usize) -> Option<usize> {
    let mut i = pos + 1;
    while let Some(&b) = payload.get(i) {
        match b {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_value(payload: &[u8], pos: usize) -> Option<usize> {
    match payload.get(pos)? {
        b'"' => skip_string(payload, pos),
        b'{' | b'[' => skip_container(payload, pos),
        _ => {
            let mut i = pos;
            while let Some(&b) = payload.get(i) {
                if matches!(b, b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
                    break;
                }
                i += 1;
            }
            (i > pos).then_some(i)
        }
    }
}

fn skip_container(payload: &[u8], pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = pos;
    while let Some(&b) = payload.get(i) {
        match b {
            b'"' => {
                i = skip_string(payload, i)?;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
