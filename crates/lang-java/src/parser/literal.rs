//! Literal token decoding.

use crate::ast::Literal;

pub(crate) fn integer(token: &str) -> Result<Literal, String> {
    let cleaned: String = token.chars().filter(|c| *c != '_').collect();
    let (digits, is_long) = match cleaned.strip_suffix(['l', 'L']) {
        Some(d) => (d, true),
        None => (cleaned.as_str(), false),
    };
    let (radix, body) = if let Some(b) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, b)
    } else if let Some(b) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (2, b)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    let value = u64::from_str_radix(body, radix)
        .map_err(|_| format!("integer literal `{token}` is out of range"))?;

    // Decimal literals may reach 2^31 / 2^63 only as the operand of unary
    // minus; the wrapped value is what negation expects.
    if is_long {
        if radix == 10 && value > 1 << 63 {
            return Err(format!("integer literal `{token}` is out of range"));
        }
        Ok(Literal::Long(value as i64))
    } else {
        let limit = if radix == 10 { 1 << 31 } else { u32::MAX as u64 };
        if value > limit {
            return Err(format!("integer literal `{token}` is out of range"));
        }
        Ok(Literal::Int(value as u32 as i32))
    }
}

pub(crate) fn floating(token: &str) -> Result<Literal, String> {
    let cleaned: String = token.chars().filter(|c| *c != '_').collect();
    let (body, is_float) = match cleaned.chars().last() {
        Some('f' | 'F') => (&cleaned[..cleaned.len() - 1], true),
        Some('d' | 'D') => (&cleaned[..cleaned.len() - 1], false),
        _ => (cleaned.as_str(), false),
    };
    let bad = || format!("malformed floating-point literal `{token}`");
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let value = hex_float(hex).ok_or_else(bad)?;
        return Ok(if is_float {
            Literal::Float(value as f32)
        } else {
            Literal::Double(value)
        });
    }
    if is_float {
        body.parse::<f32>().map(Literal::Float).map_err(|_| bad())
    } else {
        body.parse::<f64>().map(Literal::Double).map_err(|_| bad())
    }
}

/// `1.8p3` style mantissa and binary exponent, without the `0x` prefix.
fn hex_float(s: &str) -> Option<f64> {
    let (mantissa, exponent) = s.split_once(['p', 'P'])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut value = 0f64;
    for c in int_part.chars().chain(frac_part.chars()) {
        value = value * 16.0 + c.to_digit(16)? as f64;
    }
    let scale = exponent - 4 * frac_part.len() as i32;
    Some(value * 2f64.powi(scale))
}

pub(crate) fn character(token: &str) -> Result<Literal, String> {
    let inner = token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(|| format!("malformed character literal {token}"))?;
    let units = unescape(inner)?;
    match units.as_slice() {
        [unit] => Ok(Literal::Char(*unit)),
        _ => Err(format!("character literal {token} must hold one character")),
    }
}

pub(crate) fn string(token: &str) -> Result<Literal, String> {
    let units = if let Some(block) = token
        .strip_prefix("\"\"\"")
        .and_then(|t| t.strip_suffix("\"\"\""))
    {
        unescape(&strip_indent(block)?)?
    } else {
        let inner = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .ok_or_else(|| format!("malformed string literal {token}"))?;
        unescape(inner)?
    };
    Ok(Literal::String(String::from_utf16_lossy(&units)))
}

/// Text-block normalization: drop the opening line, remove incidental
/// indentation and trailing spaces. Escapes are interpreted afterwards.
fn strip_indent(block: &str) -> Result<String, String> {
    let (opening, content) = block
        .split_once('\n')
        .ok_or_else(|| "text block must start on a new line".to_string())?;
    if !opening.trim().is_empty() {
        return Err("text block must start on a new line".into());
    }
    let lines: Vec<&str> = content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let last = lines.len() - 1;
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| *i == last || !l.trim().is_empty())
        .map(|(_, l)| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let stripped: Vec<&str> = lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.get(indent..).unwrap_or("").trim_end()
            }
        })
        .collect();
    Ok(stripped.join("\n"))
}

/// Interprets escape sequences, yielding UTF-16 code units.
fn unescape(s: &str) -> Result<Vec<u16>, String> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut buf = [0u16; 2];
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }
        let Some(e) = chars.next() else {
            return Err("dangling escape".into());
        };
        let unit = match e {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0a,
            'f' => 0x0c,
            'r' => 0x0d,
            's' => 0x20,
            '"' => 0x22,
            '\'' => 0x27,
            '\\' => 0x5c,
            // Line continuation inside text blocks.
            '\n' => continue,
            '0'..='7' => {
                let max_len = if e <= '3' { 3 } else { 2 };
                let mut value = e as u16 - '0' as u16;
                for _ in 1..max_len {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            value = value * 8 + (*d as u16 - '0' as u16);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                value
            }
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(format!("malformed unicode escape \\u{hex}"));
                }
                u16::from_str_radix(&hex, 16)
                    .map_err(|_| format!("malformed unicode escape \\u{hex}"))?
            }
            other => return Err(format!("unknown escape \\{other}")),
        };
        out.push(unit);
    }
    Ok(out)
}
