//! Data models: page input, extracted records, configuration.

pub mod config;
pub mod page;
pub mod record;

pub use config::FapiaoConfig;
pub use page::{Page, Segment, Token};
pub use record::InvoiceRecord;
