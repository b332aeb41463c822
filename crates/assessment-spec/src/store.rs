//! Persistence boundary for assessments, jobs and submissions.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::responses::Submission;
use crate::spec::{Assessment, JobId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("store unavailable during {operation}")]
    Unavailable { operation: &'static str },
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("job with slug '{0}' already exists")]
    DuplicateSlug(String),
    #[error("invalid slug pattern: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub order: u32,
}

/// Query for [`AssessmentStore::list_jobs`]. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Lowercases `title` and collapses every run of characters outside
/// `[a-z0-9]` into a single dash.
pub fn slugify(title: &str) -> Result<String, PersistenceError> {
    let pattern = Regex::new("[^a-z0-9]+").map_err(|err| PersistenceError::Pattern(err.to_string()))?;
    Ok(pattern.replace_all(&title.to_lowercase(), "-").into_owned())
}

/// Asynchronous data layer used by sessions.
pub trait AssessmentStore {
    fn load_assessment(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<Option<Assessment>, PersistenceError>> + Send;

    /// Upserts by job id. New records get an id and creation timestamp;
    /// existing ones keep theirs.
    fn save_assessment(
        &self,
        assessment: Assessment,
    ) -> impl Future<Output = Result<Assessment, PersistenceError>> + Send;

    fn get_job(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = Result<Option<Job>, PersistenceError>> + Send;

    fn list_jobs(
        &self,
        filter: JobFilter,
    ) -> impl Future<Output = Result<Page<Job>, PersistenceError>> + Send;

    fn save_submission(
        &self,
        submission: Submission,
    ) -> impl Future<Output = Result<Submission, PersistenceError>> + Send;
}

#[derive(Debug, Default)]
struct Tables {
    jobs: BTreeMap<JobId, Job>,
    assessments: BTreeMap<JobId, Assessment>,
    submissions: Vec<Submission>,
    fail_next: bool,
}

impl Tables {
    fn check(&mut self, operation: &'static str) -> Result<(), PersistenceError> {
        if std::mem::take(&mut self.fail_next) {
            tracing::warn!(operation, "injected store failure");
            return Err(PersistenceError::Unavailable { operation });
        }
        Ok(())
    }
}

/// In-memory store with simulated latency. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            tables: Arc::default(),
            latency: Duration::from_millis(config.latency_ms),
        }
    }

    /// Makes the next store operation fail with [`PersistenceError::Unavailable`].
    pub async fn inject_failure(&self) {
        self.tables.lock().await.fail_next = true;
    }

    /// Creates a job with a unique slug, appended after the current last order.
    pub async fn add_job(
        &self,
        title: impl Into<String>,
        tags: Vec<String>,
        status: JobStatus,
    ) -> Result<Job, PersistenceError> {
        let title = title.into();
        let slug = slugify(&title)?;
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("add_job")?;
        if tables.jobs.values().any(|job| job.slug == slug) {
            return Err(PersistenceError::DuplicateSlug(slug));
        }
        let id = tables.jobs.keys().next_back().map_or(1, |last| last + 1);
        let order = tables.jobs.values().map(|job| job.order).max().unwrap_or(0) + 1;
        let job = Job {
            id,
            title,
            slug,
            status,
            tags,
            order,
        };
        tables.jobs.insert(id, job.clone());
        tracing::debug!(job_id = id, slug = %job.slug, "job created");
        Ok(job)
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.tables.lock().await.submissions.clone()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl AssessmentStore for MemoryStore {
    async fn load_assessment(&self, job_id: JobId) -> Result<Option<Assessment>, PersistenceError> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("load_assessment")?;
        Ok(tables.assessments.get(&job_id).cloned())
    }

    async fn save_assessment(&self, mut assessment: Assessment) -> Result<Assessment, PersistenceError> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("save_assessment")?;
        match tables.assessments.get(&assessment.job_id) {
            Some(existing) => {
                assessment.id = existing.id.clone();
                assessment.created_at = existing.created_at.clone();
            }
            None => {
                assessment.id = Some(Uuid::new_v4().to_string());
                assessment.created_at = Some(Utc::now().to_rfc3339());
            }
        }
        tables
            .assessments
            .insert(assessment.job_id, assessment.clone());
        tracing::debug!(
            job_id = assessment.job_id,
            sections = assessment.sections.len(),
            "assessment saved"
        );
        Ok(assessment)
    }

    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>, PersistenceError> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("get_job")?;
        Ok(tables.jobs.get(&job_id).cloned())
    }

    async fn list_jobs(&self, filter: JobFilter) -> Result<Page<Job>, PersistenceError> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("list_jobs")?;

        let search = filter
            .search
            .as_deref()
            .filter(|search| !search.is_empty())
            .map(str::to_lowercase);
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| {
                search.as_deref().is_none_or(|needle| {
                    job.title.to_lowercase().contains(needle)
                        || job.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
                })
            })
            .filter(|job| filter.status.is_none_or(|status| job.status == status))
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.order);

        let page = filter.page.max(1);
        let page_size = filter.page_size.max(1);
        let total = jobs.len();
        let data = jobs
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Ok(Page {
            data,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size),
        })
    }

    async fn save_submission(&self, mut submission: Submission) -> Result<Submission, PersistenceError> {
        self.delay().await;
        let mut tables = self.tables.lock().await;
        tables.check("save_submission")?;
        if submission.assessment_id.is_none() {
            submission.assessment_id = tables
                .assessments
                .get(&submission.job_id)
                .and_then(|assessment| assessment.id.clone());
        }
        submission.id = Some(Uuid::new_v4().to_string());
        submission.submitted_at = Some(Utc::now().to_rfc3339());
        tables.submissions.push(submission.clone());
        tracing::debug!(
            job_id = submission.job_id,
            answers = submission.responses.len(),
            "submission recorded"
        );
        Ok(submission)
    }
}
