//! Number formatting for shader source text and cache-IDs.

/// Formats an `f32` as a shader float literal.
///
/// Integral values keep a trailing `.0` so the target compiler reads a
/// float, not an int. The `4.0` form is used rather than the shorter `4.`:
/// both are float literals in GLSL, HLSL, Cg, Metal and OSL, and `4.0` is
/// also how constants are spelled in the hand-written shader snippets.
/// Very large or small magnitudes print in exponent form (`3.4028235e38`),
/// which is a float literal as well. Non-finite values cannot be written as
/// literals and are replaced by `±FLT_MAX` (NaN by 0).
///
/// ```rust
/// use vfx_math::float_literal;
///
/// assert_eq!(float_literal(1.0), "1.0");
/// assert_eq!(float_literal(-0.25), "-0.25");
/// assert_eq!(float_literal(f32::INFINITY), float_literal(f32::MAX));
/// ```
pub fn float_literal(v: f32) -> String {
    format!("{:?}", crate::sanitize_float(v))
}

/// Formats an `f64` with full round-trip precision, as a float literal.
pub fn double_literal(v: f64) -> String {
    let v = if v.is_nan() {
        0.0
    } else if v.is_infinite() {
        f64::MAX.copysign(v)
    } else {
        v
    };
    format!("{v:?}")
}

/// Formats a float with 7 significant digits, `%g` style.
///
/// Trailing zeros are trimmed; exponents below -4 or at/above 7 switch to
/// scientific notation. Used for cache-IDs, so the output is stable across
/// platforms.
///
/// ```rust
/// use vfx_math::format_sig7;
///
/// assert_eq!(format_sig7(0.5), "0.5");
/// assert_eq!(format_sig7(1.0 / 3.0), "0.3333333");
/// assert_eq!(format_sig7(1234567.0), "1234567");
/// assert_eq!(format_sig7(12345678.0), "1.234568e7");
/// assert_eq!(format_sig7(0.0), "0");
/// ```
pub fn format_sig7(v: f32) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    if v == 0.0 {
        return "0".to_string();
    }

    // `{:.6e}` rounds to 7 significant digits, yielding e.g. "1.234568e3".
    let sci = format!("{v:.6e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if !(-4..7).contains(&exp) {
        return format!("{}e{}", trim_zeros(mantissa), exp);
    }

    let decimals = (6 - exp).max(0) as usize;
    let fixed = format!("{v:.decimals$}");
    trim_zeros(&fixed).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_literal_forms() {
        assert_eq!(float_literal(0.0), "0.0");
        assert_eq!(float_literal(2.0), "2.0");
        assert_eq!(float_literal(0.5), "0.5");
        assert_eq!(float_literal(f32::NAN), "0.0");
        assert_eq!(float_literal(f32::NEG_INFINITY), format!("{:?}", -f32::MAX));
    }

    #[test]
    fn test_float_literal_is_never_an_int() {
        assert_eq!(float_literal(4.0), "4.0");
        assert_eq!(float_literal(-65504.0), "-65504.0");
        for v in [0.0, 1.0, -3.0, 1024.0, 1e-8, 1e20, f32::MAX, f32::MIN_POSITIVE] {
            let lit = float_literal(v);
            assert!(lit.contains('.') || lit.contains('e'), "{lit}");
            assert_eq!(lit.parse::<f32>().unwrap(), v);
        }
    }

    #[test]
    fn test_double_literal_round_trip() {
        let v = 0.1_f64 + 0.2;
        let s = double_literal(v);
        assert_eq!(s.parse::<f64>().unwrap(), v);
        assert_eq!(double_literal(3.0), "3.0");
    }

    #[test]
    fn test_sig7() {
        assert_eq!(format_sig7(-2.5), "-2.5");
        assert_eq!(format_sig7(0.0001), "0.0001");
        assert_eq!(format_sig7(0.00001), "1e-5");
        assert_eq!(format_sig7(100.0), "100");
        assert_eq!(format_sig7(0.18), "0.18");
        assert_eq!(format_sig7(f32::INFINITY), "inf");
    }

    #[test]
    fn test_sig7_rounding_changes_exponent() {
        assert_eq!(format_sig7(99999992.0), "1e8");
    }
}
