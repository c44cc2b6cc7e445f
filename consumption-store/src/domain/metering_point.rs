use serde::{Deserialize, Serialize};

/// A registered supply point (CUPS). Only the identifier is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteringPoint {
    #[serde(rename = "Id")]
    pub id: String,
}

/// A provider invoicing period, passed back verbatim when fetching its readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    pub label: String,
    pub value: String,
}
