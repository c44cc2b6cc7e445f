pub mod consumption;
pub mod hourly_reading;
pub mod metering_point;

pub use consumption::{ConsumptionDocument, ConsumptionRecord, Day, NormalizedRecord, ISO_OFFSET_FORMAT};
pub use hourly_reading::{ObtainingMethod, RawHourlyPoint, ESTIMATED_CODE};
pub use metering_point::{BillingCycle, MeteringPoint};
