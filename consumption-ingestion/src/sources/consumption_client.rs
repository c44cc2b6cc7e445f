use std::sync::Arc;

use consumption_store::domain::{Day, MeteringPoint, RawHourlyPoint};
use time::Date;

use crate::config::Credentials;
use crate::pipeline::PipelineError;
use crate::sources::ProviderApi;

/// Authenticated access to the readings of the most recently registered metering point.
pub struct ConsumptionClient<P> {
    api: Arc<P>,
}

impl<P> Clone for ConsumptionClient<P> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<P: ProviderApi> ConsumptionClient<P> {
    pub async fn connect(mut api: P, credentials: &Credentials) -> Result<Self, PipelineError> {
        api.authenticate(credentials).await?;
        tracing::info!(user = %credentials.username, "authenticated against provider");
        Ok(Self { api: Arc::new(api) })
    }

    async fn latest_metering_point(&self) -> Result<MeteringPoint, PipelineError> {
        let mut points = self.api.list_metering_points().await?;
        // Last registered wins when the account holds several supply points.
        points
            .pop()
            .ok_or_else(|| PipelineError::MalformedResponse("no metering points registered".to_string()))
    }

    pub async fn last_invoiced_readings(&self) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError> {
        let point = self.latest_metering_point().await?;
        let cycles = self.api.list_billing_cycles(&point.id).await?;
        let cycle = cycles.first().ok_or_else(|| {
            PipelineError::MalformedResponse(format!("no billing cycles for metering point {}", point.id))
        })?;

        tracing::info!(point = %point.id, cycle = %cycle.label, "retrieving last invoiced readings");
        self.api.readings_for_cycle(&point.id, cycle).await
    }

    pub async fn readings_in_interval(
        &self,
        start: Date,
        end: Date,
    ) -> Result<Vec<Day<RawHourlyPoint>>, PipelineError> {
        let point = self.latest_metering_point().await?;

        tracing::info!(point = %point.id, %start, %end, "retrieving readings for interval");
        self.api.readings_in_interval(&point.id, start, end).await
    }
}
