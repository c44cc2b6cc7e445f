use std::sync::Arc;

use consumption_store::domain::{ConsumptionDocument, ConsumptionRecord, Day};
use futures::StreamExt;
use time::Date;

use crate::config::Credentials;
use crate::observability::{self, PipelineEvent, PipelineObserver};
use crate::pipeline::{Envelope, Extraction, PipelineError, Retrieval, Source};
use crate::sinks::OutputSink;
use crate::sources::{ConsumptionClient, ProviderApi, ProviderSource};
use crate::transform::{filter_day, invoiced_day, TimeNormalizer};

/// Provider readings -> local-labelled records -> UTC view -> configured sinks.
///
/// The persisted document keeps the local-labelled records; the UTC view only
/// names the output file and feeds the database sink. Sinks are staged first and
/// committed only once every one of them staged successfully.
pub struct ConsumptionPipeline<P> {
    client: ConsumptionClient<P>,
    normalizer: TimeNormalizer,
    sinks: Vec<OutputSink>,
    observer: Arc<dyn PipelineObserver>,
    creation_date: Option<Date>,
}

impl<P: ProviderApi + 'static> ConsumptionPipeline<P> {
    pub async fn connect(
        api: P,
        credentials: &Credentials,
        normalizer: TimeNormalizer,
        sinks: Vec<OutputSink>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self, PipelineError> {
        let client = ConsumptionClient::connect(api, credentials).await?;
        observer.notify(&PipelineEvent::Authenticated);

        Ok(Self {
            client,
            normalizer,
            sinks,
            observer,
            creation_date: None,
        })
    }

    /// Stamp documents with `date` instead of today's date in the source zone.
    pub fn with_creation_date(mut self, date: Date) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub async fn run_last_invoiced(&self) -> Result<ConsumptionDocument, PipelineError> {
        self.run(Retrieval::LastInvoiced).await
    }

    pub async fn run_interval(&self, start: Date, end: Date) -> Result<ConsumptionDocument, PipelineError> {
        if start > end {
            return Err(PipelineError::Config(format!("interval start {start} is after end {end}")));
        }
        self.run(Retrieval::Interval { start, end }).await
    }

    /// Extract, then deliver to every sink. Either all sinks commit or none does.
    pub async fn run(&self, retrieval: Retrieval) -> Result<ConsumptionDocument, PipelineError> {
        let envelope = Envelope::new(self.extract(retrieval).await?);
        self.deliver(&envelope).await?;
        Ok(envelope.payload.document)
    }

    async fn deliver(&self, envelope: &Envelope<Extraction>) -> Result<(), PipelineError> {
        let mut staged = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            staged.push((sink.name(), sink.stage(&envelope.payload).await?));
        }

        // A failed commit drops the remaining staged writes unpublished.
        staged.sort_by_key(|(_, output)| output.commit_rank());
        for (name, output) in staged {
            output.commit().await?;
            self.observer.notify(&PipelineEvent::Wrote { sink: name });
        }

        observability::record_latency(envelope.received_at);
        Ok(())
    }

    /// Fetch and shape the readings without writing anything.
    pub async fn extract(&self, retrieval: Retrieval) -> Result<Extraction, PipelineError> {
        let source = ProviderSource::new(self.client.clone(), retrieval);
        let mut stream = source.stream().await;

        let mut fetched = 0;
        let mut days: Vec<Day<ConsumptionRecord>> = Vec::new();
        while let Some(item) = stream.next().await {
            let day = item?.payload;
            fetched += 1;

            if retrieval.filters_readings() {
                days.extend(filter_day(day));
            } else {
                days.push(invoiced_day(day)?);
            }
        }

        self.observer.notify(&PipelineEvent::Fetched { days: fetched });
        self.observer.notify(&PipelineEvent::Filtered {
            kept: days.len(),
            dropped: fetched - days.len(),
        });

        let normalized = self.normalizer.reformat(&days)?;
        if normalized.iter().all(|day| day.is_empty()) {
            return Err(PipelineError::MalformedResponse(format!(
                "provider returned no usable readings for {retrieval:?}"
            )));
        }

        let creation_date = match self.creation_date {
            Some(date) => date,
            None => self.normalizer.today()?,
        };

        Ok(Extraction {
            document: ConsumptionDocument {
                creation_date,
                hourly_consumption: days,
            },
            normalized,
        })
    }
}
