use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// Closed set of filing families the extraction strategy knows how to specialise for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum FilingCategory {
    AnnualReport,
    QuarterlyReport,
    CurrentReport,
    InsiderTransaction,
    ProxyStatement,
    Other,
}

impl fmt::Display for FilingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilingCategory::AnnualReport => write!(f, "10-K"),
            FilingCategory::QuarterlyReport => write!(f, "10-Q"),
            FilingCategory::CurrentReport => write!(f, "8-K"),
            FilingCategory::InsiderTransaction => write!(f, "4"),
            FilingCategory::ProxyStatement => write!(f, "DEF 14A"),
            FilingCategory::Other => write!(f, "other"),
        }
    }
}

pub static FILING_CATEGORIES: Lazy<String> = Lazy::new(|| {
    FilingCategory::iter()
        .filter(|c| !matches!(c, FilingCategory::Other))
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl FilingCategory {
    pub fn list_types() -> &'static str {
        &FILING_CATEGORIES
    }

    /// Canonical identifier under which the category's primary form is registered.
    pub fn canonical_id(&self) -> Option<&'static str> {
        match self {
            FilingCategory::AnnualReport => Some("10-K"),
            FilingCategory::QuarterlyReport => Some("10-Q"),
            FilingCategory::CurrentReport => Some("8-K"),
            FilingCategory::InsiderTransaction => Some("4"),
            FilingCategory::ProxyStatement => Some("DEF 14A"),
            FilingCategory::Other => None,
        }
    }
}

impl FromStr for FilingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<FilingCategory, String> {
        let normalized = s.trim().to_uppercase().replace(' ', "");
        match normalized.as_str() {
            "10-K" | "10K" | "FORM10K" | "10-K/A" | "10-K405" => Ok(FilingCategory::AnnualReport),
            "10-Q" | "10Q" | "FORM10Q" | "10-Q/A" => Ok(FilingCategory::QuarterlyReport),
            "8-K" | "8K" | "FORM8K" | "8-K/A" => Ok(FilingCategory::CurrentReport),
            "4" | "FORM4" | "4/A" => Ok(FilingCategory::InsiderTransaction),
            "DEF14A" | "FORMDEF14A" | "DEFA14A" => Ok(FilingCategory::ProxyStatement),
            _ => Ok(FilingCategory::Other),
        }
    }
}
