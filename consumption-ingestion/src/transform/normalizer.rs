use chrono::{Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use consumption_store::domain::{ConsumptionRecord, Day, NormalizedRecord};
use time::{Date, Month, OffsetDateTime};

use crate::pipeline::PipelineError;

pub const DEFAULT_TIMEZONE: &str = "Europe/Madrid";

/// Converts the provider's local wall-clock labels into UTC instants.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self { tz: chrono_tz::Europe::Madrid }
    }
}

impl TimeNormalizer {
    pub fn new(timezone: &str) -> Result<Self, PipelineError> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|e| PipelineError::Config(format!("unknown timezone '{timezone}': {e}")))?;
        Ok(Self { tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Interpret `DD/MM/YYYY` at `local_hour`:00 in the source zone and convert to UTC.
    ///
    /// On the autumn fall-back the repeated hour resolves to its second,
    /// standard-time occurrence. An hour skipped by the spring change is read
    /// with the offset in force just before the skip.
    pub fn to_utc(&self, local_date: &str, local_hour: u8) -> Result<OffsetDateTime, PipelineError> {
        if local_hour > 23 {
            return Err(PipelineError::MalformedResponse(format!(
                "hour {local_hour} is outside 0..23 on {local_date}"
            )));
        }

        let raw = format!("{local_date} {local_hour:02}:00:00");
        let naive = NaiveDateTime::parse_from_str(&raw, "%d/%m/%Y %H:%M:%S")
            .map_err(|e| PipelineError::MalformedResponse(format!("invalid local timestamp '{raw}': {e}")))?;

        let naive_utc = match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(local) => local.naive_utc(),
            LocalResult::Ambiguous(_, standard) => standard.naive_utc(),
            LocalResult::None => {
                let offset = self
                    .tz
                    .offset_from_local_datetime(&(naive - Duration::hours(24)))
                    .earliest()
                    .ok_or_else(|| {
                        PipelineError::MalformedResponse(format!("cannot resolve local time '{raw}'"))
                    })?;
                naive - Duration::seconds(i64::from(offset.fix().local_minus_utc()))
            }
        };

        OffsetDateTime::from_unix_timestamp(naive_utc.and_utc().timestamp())
            .map_err(|e| PipelineError::MalformedResponse(format!("timestamp '{raw}' out of range: {e}")))
    }

    /// Stamp every record with the UTC start of its hour, keeping day grouping and order.
    ///
    /// `hour` is the provider's 1-based slot, so slot N starts at N-1:00 local time.
    pub fn reformat(&self, days: &[Day<ConsumptionRecord>]) -> Result<Vec<Day<NormalizedRecord>>, PipelineError> {
        days.iter()
            .map(|day| {
                day.iter()
                    .map(|rec| self.normalize(rec))
                    .collect::<Result<Day<NormalizedRecord>, PipelineError>>()
            })
            .collect()
    }

    fn normalize(&self, rec: &ConsumptionRecord) -> Result<NormalizedRecord, PipelineError> {
        let local_hour = rec
            .hour
            .checked_sub(1)
            .ok_or_else(|| PipelineError::MalformedResponse(format!("hour index 0 on {}", rec.date)))?;

        Ok(NormalizedRecord {
            datetime: self.to_utc(&rec.date, local_hour)?,
            consumption: rec.consumption,
        })
    }

    /// Today's calendar date in the source zone.
    pub fn today(&self) -> Result<Date, PipelineError> {
        to_date(Utc::now().with_timezone(&self.tz).date_naive())
    }
}

fn to_date(naive: NaiveDate) -> Result<Date, PipelineError> {
    let invalid = |e: time::error::ComponentRange| PipelineError::Config(format!("invalid date {naive}: {e}"));
    let month = Month::try_from(naive.month() as u8).map_err(invalid)?;
    Date::from_calendar_date(naive.year(), month, naive.day() as u8).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consumption_store::domain::ISO_OFFSET_FORMAT;
    use time::macros::datetime;

    fn record(date: &str, hour: u8, consumption: f64) -> ConsumptionRecord {
        ConsumptionRecord {
            date: date.to_string(),
            hour,
            label: format!("{:02} - {:02} h", hour - 1, hour),
            consumption,
        }
    }

    fn iso(ts: OffsetDateTime) -> String {
        ts.format(ISO_OFFSET_FORMAT).unwrap()
    }

    #[test]
    fn winter_local_time_is_one_hour_ahead_of_utc() {
        let tn = TimeNormalizer::default();

        assert_eq!(tn.to_utc("08/03/2023", 1).unwrap(), datetime!(2023-03-08 00:00:00 UTC));
        assert_eq!(iso(tn.to_utc("08/03/2023", 0).unwrap()), "2023-03-07T23:00:00+00:00");
    }

    #[test]
    fn summer_local_time_is_two_hours_ahead_of_utc() {
        let tn = TimeNormalizer::default();

        assert_eq!(tn.to_utc("15/07/2023", 12).unwrap(), datetime!(2023-07-15 10:00:00 UTC));
    }

    #[test]
    fn spring_gap_hour_uses_offset_before_the_change() {
        let tn = TimeNormalizer::default();

        // 2023-03-26: 02:00 CET jumps to 03:00 CEST.
        assert_eq!(tn.to_utc("26/03/2023", 1).unwrap(), datetime!(2023-03-26 00:00:00 UTC));
        assert_eq!(tn.to_utc("26/03/2023", 2).unwrap(), datetime!(2023-03-26 01:00:00 UTC));
        assert_eq!(tn.to_utc("26/03/2023", 3).unwrap(), datetime!(2023-03-26 01:00:00 UTC));
    }

    #[test]
    fn autumn_repeated_hour_resolves_to_standard_time() {
        let tn = TimeNormalizer::default();

        // 2023-10-29: 03:00 CEST falls back to 02:00 CET.
        assert_eq!(tn.to_utc("29/10/2023", 1).unwrap(), datetime!(2023-10-28 23:00:00 UTC));
        assert_eq!(tn.to_utc("29/10/2023", 2).unwrap(), datetime!(2023-10-29 01:00:00 UTC));
        assert_eq!(tn.to_utc("29/10/2023", 3).unwrap(), datetime!(2023-10-29 02:00:00 UTC));
    }

    #[test]
    fn rejects_out_of_range_hours_and_bad_dates() {
        let tn = TimeNormalizer::default();

        assert!(matches!(tn.to_utc("08/03/2023", 24), Err(PipelineError::MalformedResponse(_))));
        assert!(matches!(tn.to_utc("2023-03-08", 1), Err(PipelineError::MalformedResponse(_))));
        assert!(matches!(tn.to_utc("31/02/2023", 1), Err(PipelineError::MalformedResponse(_))));
    }

    #[test]
    fn reformat_shifts_one_based_hours_and_keeps_grouping() {
        let tn = TimeNormalizer::default();
        let days = vec![
            vec![record("08/03/2023", 1, 0.922), record("08/03/2023", 2, 0.539)],
            vec![record("09/03/2023", 24, 0.301)],
        ];

        let normalized = tn.reformat(&days).unwrap();

        assert_eq!(normalized.len(), 2);
        assert_eq!(
            normalized[0],
            vec![
                NormalizedRecord {
                    datetime: datetime!(2023-03-07 23:00:00 UTC),
                    consumption: 0.922,
                },
                NormalizedRecord {
                    datetime: datetime!(2023-03-08 00:00:00 UTC),
                    consumption: 0.539,
                },
            ]
        );
        assert_eq!(normalized[1][0].datetime, datetime!(2023-03-09 22:00:00 UTC));
    }

    #[test]
    fn reformat_is_deterministic() {
        let tn = TimeNormalizer::default();
        let days = vec![vec![record("08/03/2023", 1, 0.922), record("08/03/2023", 2, 0.539)]];

        assert_eq!(tn.reformat(&days).unwrap(), tn.reformat(&days).unwrap());
    }

    #[test]
    fn reformat_rejects_slot_beyond_a_day() {
        let tn = TimeNormalizer::default();
        let days = vec![vec![record("29/10/2023", 25, 0.2)]];

        assert!(matches!(tn.reformat(&days), Err(PipelineError::MalformedResponse(_))));
    }

    #[test]
    fn unknown_timezone_is_a_config_error() {
        assert!(matches!(TimeNormalizer::new("Mars/Olympus"), Err(PipelineError::Config(_))));
        assert_eq!(TimeNormalizer::new("Europe/Lisbon").unwrap().timezone(), chrono_tz::Europe::Lisbon);
    }
}
