use consumption_store::domain::{Day, RawHourlyPoint};
use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Retrieval, Source};
use crate::sources::{ConsumptionClient, ProviderApi};

/// Streams the provider's readings one day at a time.
///
/// The provider answers a retrieval with all days at once, so the stream
/// yields nothing until that single request completes.
pub struct ProviderSource<P> {
    client: ConsumptionClient<P>,
    retrieval: Retrieval,
}

impl<P> ProviderSource<P> {
    pub fn new(client: ConsumptionClient<P>, retrieval: Retrieval) -> Self {
        Self { client, retrieval }
    }
}

#[async_trait::async_trait]
impl<P: ProviderApi + 'static> Source<Day<RawHourlyPoint>> for ProviderSource<P> {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<Day<RawHourlyPoint>>, PipelineError>> + Send>> {
        let client = self.client.clone();
        let retrieval = self.retrieval;
        let s = async_stream::try_stream! {
            let days = match retrieval {
                Retrieval::LastInvoiced => client.last_invoiced_readings().await?,
                Retrieval::Interval { start, end } => client.readings_in_interval(start, end).await?,
            };

            for day in days {
                yield Envelope::new(day);
            }
        };

        Box::pin(s)
    }
}
