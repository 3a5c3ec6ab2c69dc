//! Number ⇄ string conversion routines shared by the parser and stringifier.
//!
//! `scan_number` is the general-purpose (lenient) numeric scanner; the parser
//! applies the stricter JSON restrictions before calling it and then trusts the
//! consumed length it reports. `number_to_string` lays out the shortest
//! round-trip digits the way ECMAScript `Number::toString` does.

/// Scan the longest numeric prefix of `units`.
///
/// Accepts an optional sign, integer digits, an optional fraction (possibly
/// empty, e.g. `1.`), and an optional exponent. An exponent marker that is not
/// followed by digits is left unconsumed. Returns the parsed value and the
/// number of code units consumed, or `None` if there is no mantissa digit.
pub fn scan_number(units: &[u16]) -> Option<(f64, usize)> {
    let mut i = 0;
    if matches!(units.first(), Some(&c) if c == u16::from(b'-') || c == u16::from(b'+')) {
        i += 1;
    }

    let int_start = i;
    i = skip_digits(units, i);
    let mut mantissa_digits = i - int_start;

    if units.get(i) == Some(&u16::from(b'.')) {
        let frac_start = i + 1;
        let frac_end = skip_digits(units, frac_start);
        mantissa_digits += frac_end - frac_start;
        i = frac_end;
    }

    if mantissa_digits == 0 {
        return None;
    }

    if matches!(units.get(i), Some(&c) if c == u16::from(b'e') || c == u16::from(b'E')) {
        let mut j = i + 1;
        if matches!(units.get(j), Some(&c) if c == u16::from(b'-') || c == u16::from(b'+')) {
            j += 1;
        }
        let exp_end = skip_digits(units, j);
        if exp_end > j {
            i = exp_end;
        }
    }

    // Everything consumed is ASCII, so a byte-per-unit copy is exact.
    let text: String = units[..i].iter().map(|&u| u as u8 as char).collect();
    text.parse::<f64>().ok().map(|value| (value, i))
}

fn skip_digits(units: &[u16], mut i: usize) -> usize {
    while matches!(units.get(i), Some(&c) if is_digit(c)) {
        i += 1;
    }
    i
}

pub(crate) fn is_digit(unit: u16) -> bool {
    (u16::from(b'0')..=u16::from(b'9')).contains(&unit)
}

/// Format a number the way ECMAScript `Number::toString` does.
///
/// - `NaN`, `Infinity`, `-Infinity` are spelled out
/// - `-0` formats as `0`
/// - Decimal exponents in `[-7, 21)` are written positionally, others as `1e+21` / `1e-7`
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }

    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e3".
    let formatted = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        out.push_str(&formatted);
        return out;
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.push_str(&"0".repeat((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-n) as usize));
        out.push_str(&digits);
    } else {
        let e = n - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if e < 0 { '-' } else { '+' });
        out.push_str(&e.abs().to_string());
    }
    out
}
