/// Unsigned decimal: `32`, `69.5`, `.5`. Signs, exponents, `inf`/`nan` and
/// digit strings too long for an `f64` are rejected.
pub(crate) fn parse_decimal(s: &str) -> Option<f64> {
    let mut digits = 0;
    let mut dots = 0;
    for ch in s.chars() {
        match ch {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Unsigned integer or `int/int` ratio with a nonzero denominator.
pub(crate) fn parse_ratio(s: &str) -> Option<f64> {
    let (num, den) = match s.split_once('/') {
        Some((n, d)) => (n, Some(d)),
        None => (s, None),
    };
    let num = parse_unsigned_int(num)?;
    match den {
        None => Some(num),
        Some(d) => {
            let d = parse_unsigned_int(d)?;
            if d == 0.0 {
                None
            } else {
                Some(num / d)
            }
        }
    }
}

/// Either form accepted by [`parse_decimal`] or [`parse_ratio`].
pub(crate) fn parse_fraction(s: &str) -> Option<f64> {
    if s.contains('/') {
        parse_ratio(s)
    } else {
        parse_decimal(s)
    }
}

fn parse_unsigned_int(s: &str) -> Option<f64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok().map(|v| v as f64)
}
