use consumption_store::domain::{BillingCycle, Day, MeteringPoint, RawHourlyPoint};
use time::Date;

use crate::config::Credentials;
use crate::pipeline::PipelineError;

/// The provider operations the pipeline consumes.
///
/// Implementations own their authenticated session; `authenticate` must
/// succeed before any other call.
#[async_trait::async_trait]
pub trait ProviderApi: Send + Sync {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), PipelineError>;

    /// Registered metering points, oldest registration first.
    async fn list_metering_points(&self) -> Result<Vec<MeteringPoint>, PipelineError>;

    /// Billing cycles of a metering point, most recent first.
    async fn list_billing_cycles(&self, point_id: &str) -> Result<Vec<BillingCycle>, PipelineError>;

    async fn readings_for_cycle(
        &self,
        point_id: &str,
        cycle: &BillingCycle,
    ) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError>;

    async fn readings_in_interval(
        &self,
        point_id: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError>;
}
