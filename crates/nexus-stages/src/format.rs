//! Number rendering shared by the transform formatters.

/// Exponents outside `[-4, 16)` switch a reading to scientific notation
const MIN_FIXED_EXP: i32 = -4;
const MAX_FIXED_EXP: i32 = 16;

/// Render a reading the way it is shown to users: integral values keep one
/// decimal (`40.0`), other values use the shortest exact form (`23.5`), and
/// very small or very large magnitudes use an exponent (`1e-05`, `1.5e+17`).
pub fn format_reading(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    // `{:e}` yields the shortest round-trip mantissa, ex: `1.5e17`
    let scientific = format!("{:e}", value);
    if let Some((mantissa, exp)) = scientific.split_once('e') {
        if let Ok(exp) = exp.parse::<i32>() {
            if value != 0.0 && !(MIN_FIXED_EXP..MAX_FIXED_EXP).contains(&exp) {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Average with one decimal followed by its unit, ex: `22.1°C`.
pub fn format_average(value: f64, unit: &str) -> String {
    if value.is_nan() {
        return format!("nan°{}", unit);
    }
    format!("{:.1}°{}", value, unit)
}
