use anyhow::Result;

use super::{Bounds, Symbol};

/// Parses tesseract hOCR produced with `hocr_char_boxes=1` into
/// per-character symbols. Character detail lives in `ocrx_cinfo`
/// spans carrying `x_bboxes` and `x_conf` in their title attribute.
pub(super) fn parse_char_symbols(hocr: &str) -> Result<Vec<Symbol>> {
    let bytes = hocr.as_bytes();
    let mut symbols = Vec::new();
    let mut i = 0usize;

    while let Some(start) = find_subslice(bytes, b"<span", i) {
        let Some(tag_end) = find_byte(bytes, b'>', start) else {
            break;
        };
        let tag = &hocr[start..tag_end];
        if !tag.contains("ocrx_cinfo") {
            i = tag_end + 1;
            continue;
        }
        let Some(close) = find_subslice(bytes, b"</span>", tag_end + 1) else {
            break;
        };
        let inner = decode_entities(hocr[tag_end + 1..close].trim());
        i = close + "</span>".len();

        let mut chars = inner.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            continue;
        };
        if ch.is_whitespace() {
            continue;
        }
        let (Some(bounds), Some(confidence)) =
            (parse_title_bounds(tag), parse_title_conf(tag))
        else {
            continue;
        };
        if bounds.x1 <= bounds.x0 || bounds.y1 <= bounds.y0 {
            continue;
        }
        symbols.push(Symbol {
            text: ch,
            bounds,
            confidence,
        });
    }

    Ok(symbols)
}

fn parse_title_bounds(tag: &str) -> Option<Bounds> {
    let title = extract_attr(tag, "title")?;
    let idx = title.find("x_bboxes")?;
    let rest = &title[idx + "x_bboxes".len()..];
    let nums = rest
        .split([' ', ';'])
        .filter(|v| !v.is_empty())
        .take(4)
        .filter_map(|v| v.parse::<u32>().ok())
        .collect::<Vec<_>>();
    if nums.len() != 4 {
        return None;
    }
    Some(Bounds {
        x0: nums[0],
        y0: nums[1],
        x1: nums[2],
        y1: nums[3],
    })
}

fn parse_title_conf(tag: &str) -> Option<f32> {
    let title = extract_attr(tag, "title")?;
    let idx = title.find("x_conf")?;
    let rest = &title[idx + "x_conf".len()..];
    let value = rest.split([' ', ';']).find(|v| !v.is_empty())?;
    value.parse::<f32>().ok()
}

fn extract_attr(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{}=", name);
    let mut from = 0usize;
    while let Some(rel) = tag[from..].find(&needle) {
        let idx = from + rel;
        from = idx + needle.len();
        // Only a whitespace boundary starts an attribute; this keeps
        // e.g. data-title= from shadowing title=.
        if idx == 0 || !tag[..idx].ends_with(char::is_whitespace) {
            continue;
        }
        let mut rest = &tag[idx + needle.len()..];
        if rest.starts_with('"') || rest.starts_with('\'') {
            let quote = rest.chars().next()?;
            rest = &rest[1..];
            let end = rest.find(quote)?;
            return Some(rest[..end].to_string());
        }
    }
    None
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|win| win == needle)
        .map(|pos| from + pos)
}

fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|b| *b == needle)
        .map(|pos| from + pos)
}
