//! Extracted invoice record.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::patterns::CHINESE_DATE;

/// One document's extracted fields. Absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Invoice number (发票号码).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Issue date as printed, e.g. `2023年5月1日`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,

    /// Grand total written out in words.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in_words: Option<String>,

    /// Grand total in figures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in_figures: Option<Decimal>,
}

impl InvoiceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue date as a calendar date, when it parses.
    pub fn issue_date_parsed(&self) -> Option<NaiveDate> {
        self.issue_date.as_deref().and_then(parse_chinese_date)
    }

    /// Names of fields that were not found.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.invoice_number.is_none() {
            missing.push("invoice_number");
        }
        if self.issue_date.is_none() {
            missing.push("issue_date");
        }
        if self.amount_in_words.is_none() {
            missing.push("amount_in_words");
        }
        if self.amount_in_figures.is_none() {
            missing.push("amount_in_figures");
        }
        missing
    }

    /// Validate the record and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .missing_fields()
            .into_iter()
            .map(|f| format!("Missing {}", f))
            .collect();

        if let Some(date) = &self.issue_date {
            if self.issue_date_parsed().is_none() {
                issues.push(format!("Issue date is not a calendar date: {}", date));
            }
        }

        if let Some(amount) = self.amount_in_figures {
            if amount.is_sign_negative() {
                issues.push(format!("Negative total: {}", amount));
            }
        }

        issues
    }
}

/// Parse `YYYY年M月D日` into a date.
pub fn parse_chinese_date(s: &str) -> Option<NaiveDate> {
    let caps = CHINESE_DATE.captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
