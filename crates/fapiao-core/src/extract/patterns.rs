//! Common regex patterns for invoice field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number: a run of digits
    pub static ref INVOICE_NUMBER_VALUE: Regex = Regex::new(r"\d+").unwrap();

    // Issue date as printed: 2023年5月1日
    pub static ref CHINESE_DATE: Regex = Regex::new(
        r"(\d{4})年(\d{1,2})月(\d{1,2})日"
    ).unwrap();

    // Leading currency symbol on the amount in figures
    pub static ref CURRENCY_PREFIX: Regex = Regex::new(
        r"^\s*(?:[¥￥$]|RMB|CNY)\s*"
    ).unwrap();

    // Amount in figures: 10000.00, 10,000.00, -12.5
    pub static ref AMOUNT_FIGURES: Regex = Regex::new(
        r"^-?\d{1,3}(?:,\d{3})*(?:\.\d+)?$|^-?\d+(?:\.\d+)?$"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_figures() {
        assert!(AMOUNT_FIGURES.is_match("10000.00"));
        assert!(AMOUNT_FIGURES.is_match("10,000.00"));
        assert!(AMOUNT_FIGURES.is_match("-12.5"));
        assert!(!AMOUNT_FIGURES.is_match("10,00.00"));
        assert!(!AMOUNT_FIGURES.is_match("壹万"));
        assert!(!AMOUNT_FIGURES.is_match(""));
    }

    #[test]
    fn test_currency_prefix() {
        assert_eq!(CURRENCY_PREFIX.replace("¥10000.00", ""), "10000.00");
        assert_eq!(CURRENCY_PREFIX.replace(" ￥ 5.00", ""), "5.00");
        assert_eq!(CURRENCY_PREFIX.replace("5.00", ""), "5.00");
    }
}
