use crate::domain::model::{AnalysisOutcome, Upload};
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self, upload: Upload) -> Result<AnalysisOutcome> {
        tracing::info!(
            "Starting analysis of {} ({})",
            upload.filename,
            upload.document_type
        );

        let document = self.pipeline.intake(upload).await?;
        tracing::info!(
            "Validated {} ({:.2} KB, sha256 {})",
            document.filename,
            document.size_kb(),
            &document.sha256[..16]
        );

        let signals = self.pipeline.inspect(&document).await?;
        tracing::info!(
            "Metadata signals: {} red flags, {} positive",
            signals.red_flags.len(),
            signals.positive_signals.len()
        );

        let assessed = self.pipeline.assess(&document, &signals).await?;
        tracing::info!(
            "Model verdict: score {}, recommendation {}",
            assessed.report.authenticity_score,
            assessed.report.recommendation
        );

        let outcome = self.pipeline.record(&document, signals, assessed).await?;
        tracing::info!("Analysis of {} complete", outcome.filename);

        Ok(outcome)
    }
}
