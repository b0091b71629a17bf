//! Declarative field rules compiled to regex extractors.

use regex::Regex;

use super::patterns::{CHINESE_DATE, INVOICE_NUMBER_VALUE};
use crate::error::ExtractionError;
use crate::models::config::{AbsoluteField, AbsoluteRule, SiblingField, SiblingRule};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract all occurrences of the field, left to right.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A label followed, anywhere later on the same line, by a value pattern.
#[derive(Debug, Clone)]
pub struct LabeledExtractor {
    pub field: AbsoluteField,
    pattern: Regex,
}

impl LabeledExtractor {
    pub fn compile(rule: &AbsoluteRule) -> Result<Self, ExtractionError> {
        let value = match rule.field {
            AbsoluteField::InvoiceNumber => INVOICE_NUMBER_VALUE.as_str(),
            AbsoluteField::IssueDate => CHINESE_DATE.as_str(),
        };
        let pattern = format!("{}.*?(?P<value>{})", regex::escape(&rule.label), value);
        let pattern = Regex::new(&pattern).map_err(|e| ExtractionError::Pattern {
            field: rule.field.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            field: rule.field,
            pattern,
        })
    }
}

impl FieldExtractor for LabeledExtractor {
    type Output = String;

    fn extract_all(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .map(|caps| caps["value"].to_string())
            .collect()
    }
}

/// Matches the label cell of a sibling rule.
#[derive(Debug, Clone)]
pub struct SiblingMatcher {
    pub field: SiblingField,
    label: String,
}

impl SiblingMatcher {
    pub fn new(rule: &SiblingRule) -> Self {
        Self {
            field: rule.field,
            label: rule.label.clone(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, cell_text: &str) -> bool {
        !self.label.is_empty() && cell_text.contains(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ExtractionConfig;
    use pretty_assertions::assert_eq;

    fn extractor(field: AbsoluteField) -> LabeledExtractor {
        let config = ExtractionConfig::default();
        let rule = config
            .absolute_rules
            .iter()
            .find(|r| r.field == field)
            .unwrap();
        LabeledExtractor::compile(rule).unwrap()
    }

    fn first(ex: &LabeledExtractor, text: &str) -> Option<String> {
        ex.extract_all(text).into_iter().next()
    }

    #[test]
    fn test_invoice_number() {
        let ex = extractor(AbsoluteField::InvoiceNumber);
        assert_eq!(first(&ex, "发票号码：12345678"), Some("12345678".to_string()));
        assert_eq!(first(&ex, "发票号码: No 0042 (copy 2)"), Some("0042".to_string()));
        assert_eq!(first(&ex, "发票代码：3100"), None);
        assert_eq!(first(&ex, "12345678"), None);
    }

    #[test]
    fn test_issue_date() {
        let ex = extractor(AbsoluteField::IssueDate);
        assert_eq!(
            first(&ex, "开票日期：2023年5月1日"),
            Some("2023年5月1日".to_string())
        );
        assert_eq!(
            first(&ex, "开票日期:2023年12月31日 校验码"),
            Some("2023年12月31日".to_string())
        );
        assert_eq!(first(&ex, "开票日期：2023-05-01"), None);
    }

    #[test]
    fn test_extract_all() {
        let ex = extractor(AbsoluteField::InvoiceNumber);
        assert_eq!(
            ex.extract_all("发票号码 1 发票号码 2"),
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[test]
    fn test_label_is_literal() {
        let rule = AbsoluteRule {
            field: AbsoluteField::InvoiceNumber,
            label: "No.(x)".to_string(),
        };
        let ex = LabeledExtractor::compile(&rule).unwrap();
        assert_eq!(first(&ex, "No.(x) 77"), Some("77".to_string()));
        assert_eq!(first(&ex, "NoA(x) 77"), None);
    }

    #[test]
    fn test_sibling_matcher() {
        let config = ExtractionConfig::default();
        let matcher = SiblingMatcher::new(&config.sibling_rules[0]);
        assert!(matcher.matches("价税合计（大写）"));
        assert!(!matcher.matches("合计"));
    }
}
