use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::IdGenerator;
use crate::spec::question::Question;

/// Identifier of the job an assessment belongs to.
pub type JobId = u64;

/// Title given to the first section of a freshly created assessment.
pub const DEFAULT_SECTION_TITLE: &str = "General Questions";

/// Title of a new assessment whose job is unknown or untitled.
pub const FALLBACK_TITLE: &str = "New Assessment";

/// Starting assessment for a job: titled `"<job title> Assessment"` (or
/// [`FALLBACK_TITLE`]) with one empty section.
pub fn default_assessment(job_id: JobId, job_title: Option<&str>) -> Assessment {
    let title = match job_title.map(str::trim).filter(|title| !title.is_empty()) {
        Some(job_title) => format!("{} Assessment", job_title),
        None => FALLBACK_TITLE.to_string(),
    };
    let section_id = IdGenerator::new().section_id(&BTreeSet::new());
    Assessment::new(job_id, title, section_id)
}

/// Ordered group of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            questions: Vec::new(),
        }
    }
}

/// Job-specific assessment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Assigned by the persistence layer on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub job_id: JobId,
    pub title: String,
    pub sections: Vec<Section>,
    /// RFC 3339 creation timestamp, assigned alongside `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Assessment {
    /// Creates an unsaved assessment with a single empty section.
    pub fn new(job_id: JobId, title: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            id: None,
            job_id,
            title: title.into(),
            sections: vec![Section::new(section_id, DEFAULT_SECTION_TITLE)],
            created_at: None,
        }
    }

    /// Questions in display order across all sections.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions().find(|question| question.id == id)
    }

    /// Section and question index of `id`.
    pub fn locate(&self, id: &str) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section_index, section)| {
                section
                    .questions
                    .iter()
                    .position(|question| question.id == id)
                    .map(|question_index| (section_index, question_index))
            })
    }

    pub fn question_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.questions.len())
            .sum()
    }

    /// Every section and question id currently in use.
    pub fn all_ids(&self) -> BTreeSet<String> {
        self.sections
            .iter()
            .flat_map(|section| {
                std::iter::once(section.id.clone())
                    .chain(section.questions.iter().map(|question| question.id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_assessment_is_titled_after_the_job() {
        let assessment = default_assessment(7, Some(" Backend Engineer "));
        assert_eq!(assessment.title, "Backend Engineer Assessment");
        assert_eq!(assessment.sections.len(), 1);
        assert_eq!(assessment.sections[0].id, "section-1");
        assert_eq!(assessment.sections[0].title, DEFAULT_SECTION_TITLE);

        assert_eq!(default_assessment(7, None).title, FALLBACK_TITLE);
        assert_eq!(default_assessment(7, Some("   ")).title, FALLBACK_TITLE);
    }
}
