use serde::{Deserialize, Serialize};

/// Provenance code the provider uses for estimated (non-measured) readings.
pub const ESTIMATED_CODE: &str = "E";

/// How the provider obtained an hourly reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObtainingMethod {
    Real,
    Estimated,
    Other(String),
}

impl ObtainingMethod {
    pub fn code(&self) -> &str {
        match self {
            Self::Real => "R",
            Self::Estimated => ESTIMATED_CODE,
            Self::Other(code) => code,
        }
    }
}

impl From<String> for ObtainingMethod {
    fn from(code: String) -> Self {
        match code.as_str() {
            "R" => Self::Real,
            ESTIMATED_CODE => Self::Estimated,
            _ => Self::Other(code),
        }
    }
}

impl From<ObtainingMethod> for String {
    fn from(method: ObtainingMethod) -> Self {
        match method {
            ObtainingMethod::Other(code) => code,
            known => known.code().to_string(),
        }
    }
}

/// One hourly slot as returned by the provider.
///
/// `hour_cch` is 1-based: slot N covers the hour ending at N:00 local time.
/// Provider fields the pipeline has no use for (`invoiced`, `typePM`, `real`,
/// `value`) are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHourlyPoint {
    /// Local calendar date, `DD/MM/YYYY`.
    pub date: String,
    #[serde(rename = "hourCCH")]
    pub hour_cch: u8,
    #[serde(rename = "hour")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_double: Option<f64>,
    pub obtaining_method: ObtainingMethod,
}
