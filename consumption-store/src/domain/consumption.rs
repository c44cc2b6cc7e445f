use serde::{Deserialize, Serialize};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date, OffsetDateTime};

use super::RawHourlyPoint;

/// An ordered run of records sharing one local calendar date.
pub type Day<T> = Vec<T>;

/// ISO-8601 with an explicit numeric offset, e.g. `2023-03-07T23:00:00+00:00`.
pub const ISO_OFFSET_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

time::serde::format_description!(iso_offset, OffsetDateTime, ISO_OFFSET_FORMAT);

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// An admissible reading, still labelled with the provider's local date and hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub date: String,
    pub hour: u8,
    pub label: String,
    pub consumption: f64,
}

impl ConsumptionRecord {
    /// `None` when the provider sent no numeric value for the slot.
    pub fn from_point(point: RawHourlyPoint) -> Option<Self> {
        let consumption = point.value_double?;
        Some(Self {
            date: point.date,
            hour: point.hour_cch,
            label: point.label,
            consumption,
        })
    }
}

/// A reading stamped with the UTC instant its hour starts at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NormalizedRecord {
    #[serde(with = "iso_offset")]
    pub datetime: OffsetDateTime,
    pub consumption: f64,
}

/// The persisted artifact of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionDocument {
    #[serde(rename = "creation date", with = "iso_date")]
    pub creation_date: Date,
    pub hourly_consumption: Vec<Day<ConsumptionRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObtainingMethod;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn record(hour: u8, label: &str, consumption: f64) -> ConsumptionRecord {
        ConsumptionRecord {
            date: "08/03/2023".to_string(),
            hour,
            label: label.to_string(),
            consumption,
        }
    }

    #[test]
    fn document_serializes_with_provider_field_names() {
        let doc = ConsumptionDocument {
            creation_date: date!(2023-04-02),
            hourly_consumption: vec![vec![record(1, "00 - 01 h", 0.922)]],
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "creation date": "2023-04-02",
                "hourly_consumption": [[
                    {"date": "08/03/2023", "hour": 1, "label": "00 - 01 h", "consumption": 0.922}
                ]]
            })
        );
    }

    #[test]
    fn normalized_record_uses_numeric_utc_offset() {
        let rec = NormalizedRecord {
            datetime: datetime!(2023-03-07 23:00:00 UTC),
            consumption: 0.922,
        };

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value, json!({"datetime": "2023-03-07T23:00:00+00:00", "consumption": 0.922}));

        let back: NormalizedRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn record_from_point_requires_value() {
        let mut point = RawHourlyPoint {
            date: "08/03/2023".to_string(),
            hour_cch: 2,
            label: "01 - 02 h".to_string(),
            value_double: Some(0.539),
            obtaining_method: ObtainingMethod::Real,
        };
        assert_eq!(ConsumptionRecord::from_point(point.clone()), Some(record(2, "01 - 02 h", 0.539)));

        point.value_double = None;
        assert_eq!(ConsumptionRecord::from_point(point), None);
    }
}
