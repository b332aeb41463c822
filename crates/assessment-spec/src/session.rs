use crate::builder::AssessmentBuilder;
use crate::config::QuestionDefaults;
use crate::responses::{ResponseSet, Submission};
use crate::spec::{Assessment, JobId, default_assessment};
use crate::store::{AssessmentStore, PersistenceError};

/// Editing session for one job's assessment, backed by a store.
pub struct AssessmentSession<S> {
    store: S,
    builder: AssessmentBuilder,
}

impl<S: AssessmentStore> AssessmentSession<S> {
    /// Loads the job's assessment, or starts a default one titled after the
    /// job with a single section.
    pub async fn open(
        store: S,
        job_id: JobId,
        defaults: QuestionDefaults,
    ) -> Result<Self, PersistenceError> {
        let assessment = match store.load_assessment(job_id).await? {
            Some(assessment) => assessment,
            None => {
                let job = store.get_job(job_id).await?;
                default_assessment(job_id, job.as_ref().map(|job| job.title.as_str()))
            }
        };
        tracing::debug!(job_id, sections = assessment.sections.len(), "assessment session opened");
        Ok(Self {
            store,
            builder: AssessmentBuilder::with_defaults(assessment, defaults),
        })
    }

    pub fn builder(&self) -> &AssessmentBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut AssessmentBuilder {
        &mut self.builder
    }

    pub fn assessment(&self) -> &Assessment {
        self.builder.assessment()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists the current schema. On failure the in-memory schema is kept
    /// as is and the error is returned.
    pub async fn save(&mut self) -> Result<Assessment, PersistenceError> {
        let snapshot = self.builder.assessment().clone();
        match self.store.save_assessment(snapshot).await {
            Ok(saved) => {
                self.builder.adopt_saved(&saved);
                Ok(saved)
            }
            Err(err) => {
                tracing::warn!(
                    job_id = self.builder.assessment().job_id,
                    error = %err,
                    "assessment save failed"
                );
                Err(err)
            }
        }
    }

    /// Records a submitted response set against this assessment.
    pub async fn record_submission(
        &self,
        responses: ResponseSet,
    ) -> Result<Submission, PersistenceError> {
        let assessment = self.builder.assessment();
        let mut submission = Submission::new(assessment.job_id, responses);
        submission.assessment_id = assessment.id.clone();
        self.store.save_submission(submission).await
    }
}
