/// Sterling amount rounded to the penny, with thousands separators: £1,234.56
pub fn money(val: f64) -> String {
    let pence = (val.abs() * 100.0).round() as u64;
    let pounds = (pence / 100).to_string();
    let sign = if val < 0.0 && pence > 0 { "-" } else { "" };

    let mut grouped = String::with_capacity(pounds.len() + pounds.len() / 3);
    for (i, digit) in pounds.chars().enumerate() {
        if i > 0 && (pounds.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}£{grouped}.{:02}", pence % 100)
}

/// Percentage with one decimal place: 17.5%
pub fn pct(val: f64) -> String {
    format!("{val:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "£1,234.56");
        assert_eq!(money(-500.00), "-£500.00");
        assert_eq!(money(0.0), "£0.00");
        assert_eq!(money(1000000.99), "£1,000,000.99");
        assert_eq!(money(9200.0), "£9,200.00");
        assert_eq!(money(1234.567), "£1,234.57");
        assert_eq!(money(-0.001), "£0.00");
    }

    #[test]
    fn test_pct_formatting() {
        assert_eq!(pct(17.5), "17.5%");
        assert_eq!(pct(14.999), "15.0%");
        assert_eq!(pct(0.0), "0.0%");
    }
}
