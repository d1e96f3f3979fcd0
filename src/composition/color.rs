use crate::foundation::error::{RenderError, RenderResult};

/// Normalize a user color to lowercase `#rrggbb`.
///
/// Accepts `#abc`, `abc`, `#aabbcc`, `aabbcc`, `rgb(r, g, b)` and `rgba(r, g, b, a)`. RGB
/// channels may be fractional; they are rounded and clamped to `0..=255`. Alpha is ignored.
pub fn normalize_hex_color(input: &str) -> RenderResult<String> {
    let s = input.trim();
    if let Some(hex) = parse_hex(s) {
        return Ok(hex);
    }
    if let Some([r, g, b]) = parse_rgb_fn(s) {
        return Ok(format!("#{r:02x}{g:02x}{b:02x}"));
    }
    Err(RenderError::invalid_request(format!(
        "unrecognized color format: '{input}'"
    )))
}

fn parse_hex(s: &str) -> Option<String> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digits = digits.to_ascii_lowercase();
    match digits.len() {
        3 => Some(digits.chars().fold(String::from("#"), |mut out, c| {
            out.push(c);
            out.push(c);
            out
        })),
        6 => Some(format!("#{digits}")),
        _ => None,
    }
}

fn parse_rgb_fn(s: &str) -> Option<[u8; 3]> {
    let lower = s.to_ascii_lowercase();
    let (body, max_args) = if let Some(rest) = lower.strip_prefix("rgba") {
        (rest, 4)
    } else if let Some(rest) = lower.strip_prefix("rgb") {
        (rest, 3)
    } else {
        return None;
    };
    let inner = body.trim_start().strip_prefix('(')?.strip_suffix(')')?;

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() < 3 || parts.len() > max_args {
        return None;
    }

    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = channel(part)?;
    }
    if let Some(alpha) = parts.get(3) {
        channel_value(alpha)?;
    }
    Some(channels)
}

fn channel(part: &str) -> Option<u8> {
    let v = channel_value(part)?;
    Some(v.round().clamp(0.0, 255.0) as u8)
}

fn channel_value(part: &str) -> Option<f64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    part.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/composition/color.rs"]
mod tests;
