use crate::validators::digits_only;

/// `DD-DDDDDDD` when the value holds exactly nine digits, otherwise unchanged.
pub fn format_tin(value: &str) -> String {
    let digits = digits_only(value);
    if digits.len() == 9 {
        format!("{}-{}", &digits[..2], &digits[2..])
    } else {
        value.to_string()
    }
}

/// `DDD DDD DDD` when the value holds exactly nine digits, otherwise unchanged.
pub fn format_routing_number(value: &str) -> String {
    let digits = digits_only(value);
    if digits.len() == 9 {
        format!("{} {} {}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        value.to_string()
    }
}
