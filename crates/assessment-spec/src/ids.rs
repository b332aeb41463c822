use std::collections::BTreeSet;

use crate::spec::Assessment;

/// Hands out section and question ids that never collide within an assessment.
///
/// Ids come from a monotonic counter; candidates already present in the
/// assessment are skipped, so documents loaded from the data layer (with
/// arbitrary ids) are safe to extend. Seed it with [`IdGenerator::for_assessment`]
/// when extending an existing document so deleted ids are not handed out again.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Starts past every numeric suffix used by the assessment, counting both
    /// live ids and `dependsOn` targets that no longer exist.
    pub fn for_assessment(assessment: &Assessment) -> Self {
        let highest = assessment
            .sections
            .iter()
            .map(|section| section.id.as_str())
            .chain(assessment.questions().flat_map(|question| {
                std::iter::once(question.id.as_str()).chain(
                    question
                        .conditional
                        .as_ref()
                        .map(|conditional| conditional.depends_on.as_str()),
                )
            }))
            .filter_map(numeric_suffix)
            .max()
            .unwrap_or(0);
        Self {
            next: highest.saturating_add(1),
        }
    }

    pub fn section_id(&mut self, taken: &BTreeSet<String>) -> String {
        self.next_with_prefix("section", taken)
    }

    pub fn question_id(&mut self, taken: &BTreeSet<String>) -> String {
        self.next_with_prefix("question", taken)
    }

    fn next_with_prefix(&mut self, prefix: &str, taken: &BTreeSet<String>) -> String {
        loop {
            let candidate = format!("{}-{}", prefix, self.next);
            self.next += 1;
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
    }
}

fn numeric_suffix(id: &str) -> Option<u64> {
    let (_, suffix) = id.rsplit_once('-')?;
    suffix.parse().ok()
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
