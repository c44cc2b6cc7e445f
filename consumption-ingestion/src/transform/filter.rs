use consumption_store::domain::{ConsumptionRecord, Day, ObtainingMethod, RawHourlyPoint};

use crate::pipeline::PipelineError;

/// A reading is kept only when it carries a value and was not estimated.
pub fn admissible(point: &RawHourlyPoint) -> bool {
    point.value_double.is_some() && point.obtaining_method != ObtainingMethod::Estimated
}

/// Keep the admissible readings of a day, in provider order.
///
/// Returns `None` when nothing survives so the day is dropped entirely.
pub fn filter_day(day: Day<RawHourlyPoint>) -> Option<Day<ConsumptionRecord>> {
    let kept: Day<ConsumptionRecord> = day
        .into_iter()
        .filter(admissible)
        .filter_map(ConsumptionRecord::from_point)
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

/// Map an invoiced day as-is. Invoiced readings are final, so every slot must carry a value.
pub fn invoiced_day(day: Day<RawHourlyPoint>) -> Result<Day<ConsumptionRecord>, PipelineError> {
    day.into_iter()
        .map(|point| {
            let slot = format!("{} hour {}", point.date, point.hour_cch);
            ConsumptionRecord::from_point(point).ok_or_else(|| {
                PipelineError::MalformedResponse(format!("invoiced reading without value at {slot}"))
            })
        })
        .collect()
}
