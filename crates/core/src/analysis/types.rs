use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Language name -> bytes of code.
pub type LanguageBytes = BTreeMap<String, u64>;

/// Per-repository results keyed by the repository id rendered as a string.
pub type RepositoryMetrics = BTreeMap<String, RepoMetricSet>;

/// Output of a single pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Branches(String),
    Directory(String),
    CodeQuality { commentary: String, score: u8 },
    Popularity { forks: u64, stars: u64 },
    Languages(LanguageBytes),
    Contribution {
        commit_rate: f64,
        code_rate: f64,
        contribution_percent: f64,
    },
    Description(String),
    CommitHistory(String),
    Readme(String),
}

/// Metrics extracted for one repository.
///
/// Starts with every field empty; steps fill it in order. A field that is
/// already set is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMetricSet {
    pub branch_commentary: Option<String>,
    pub directory_commentary: Option<String>,
    pub code_quality_commentary: Option<String>,
    pub code_quality_score: Option<u8>,
    pub language_byte_counts: Option<LanguageBytes>,
    pub fork_count: Option<u64>,
    pub star_count: Option<u64>,
    pub commit_rate: Option<f64>,
    pub code_rate: Option<f64>,
    pub contribution_percent: Option<f64>,
    pub project_description: Option<String>,
    pub commit_history_commentary: Option<String>,
    pub readme_commentary: Option<String>,
}

fn set_once<T>(slot: &mut Option<T>, value: T) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

impl RepoMetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, output: StepOutput) {
        match output {
            StepOutput::Branches(text) => set_once(&mut self.branch_commentary, text),
            StepOutput::Directory(text) => set_once(&mut self.directory_commentary, text),
            StepOutput::CodeQuality { commentary, score } => {
                set_once(&mut self.code_quality_commentary, commentary);
                set_once(&mut self.code_quality_score, score);
            }
            StepOutput::Popularity { forks, stars } => {
                set_once(&mut self.fork_count, forks);
                set_once(&mut self.star_count, stars);
            }
            StepOutput::Languages(languages) => {
                set_once(&mut self.language_byte_counts, languages)
            }
            StepOutput::Contribution {
                commit_rate,
                code_rate,
                contribution_percent,
            } => {
                set_once(&mut self.commit_rate, commit_rate);
                set_once(&mut self.code_rate, code_rate);
                set_once(&mut self.contribution_percent, contribution_percent);
            }
            StepOutput::Description(text) => set_once(&mut self.project_description, text),
            StepOutput::CommitHistory(text) => {
                set_once(&mut self.commit_history_commentary, text)
            }
            StepOutput::Readme(text) => set_once(&mut self.readme_commentary, text),
        }
    }

    /// True once every one of the 13 fields has a value.
    pub fn is_complete(&self) -> bool {
        self.branch_commentary.is_some()
            && self.directory_commentary.is_some()
            && self.code_quality_commentary.is_some()
            && self.code_quality_score.is_some()
            && self.language_byte_counts.is_some()
            && self.fork_count.is_some()
            && self.star_count.is_some()
            && self.commit_rate.is_some()
            && self.code_rate.is_some()
            && self.contribution_percent.is_some()
            && self.project_description.is_some()
            && self.commit_history_commentary.is_some()
            && self.readme_commentary.is_some()
    }
}

/// Aggregate over a user's repositories or a team's members.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectMetricSummary {
    pub follower_count: u64,
    pub repo_count: u64,
    pub branch_commentary: String,
    pub directory_commentary: String,
    pub code_quality_commentary: String,
    pub code_quality_score: f64,
    pub language_byte_counts: LanguageBytes,
    pub fork_count: u64,
    pub star_count: u64,
    pub commit_rate: f64,
    pub code_rate: f64,
    pub contribution_percent: f64,
    pub project_description: String,
    pub commit_history_commentary: String,
    pub readme_commentary: String,
}

/// Commentary fields shared by per-repository and aggregate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commentary {
    Branch,
    Directory,
    CodeQuality,
    ProjectDescription,
    CommitHistory,
    Readme,
}

impl Commentary {
    pub const ALL: [Commentary; 6] = [
        Commentary::Branch,
        Commentary::Directory,
        Commentary::CodeQuality,
        Commentary::ProjectDescription,
        Commentary::CommitHistory,
        Commentary::Readme,
    ];
}

/// Anything the aggregator can fold into a [`SubjectMetricSummary`].
pub trait MetricRecord {
    fn commentary(&self, field: Commentary) -> Option<&str>;
    fn code_quality_score(&self) -> f64;
    fn commit_rate(&self) -> f64;
    fn code_rate(&self) -> f64;
    fn contribution_percent(&self) -> f64;
    fn fork_count(&self) -> u64;
    fn star_count(&self) -> u64;
    fn language_byte_counts(&self) -> Option<&LanguageBytes>;
    /// Followers carried by the record itself, used when no profile is supplied.
    fn follower_count(&self) -> u64;
    /// Repositories represented by the record.
    fn repo_count(&self) -> u64;
}

impl MetricRecord for RepoMetricSet {
    fn commentary(&self, field: Commentary) -> Option<&str> {
        let text = match field {
            Commentary::Branch => &self.branch_commentary,
            Commentary::Directory => &self.directory_commentary,
            Commentary::CodeQuality => &self.code_quality_commentary,
            Commentary::ProjectDescription => &self.project_description,
            Commentary::CommitHistory => &self.commit_history_commentary,
            Commentary::Readme => &self.readme_commentary,
        };
        text.as_deref()
    }

    fn code_quality_score(&self) -> f64 {
        self.code_quality_score.map(f64::from).unwrap_or(0.0)
    }

    fn commit_rate(&self) -> f64 {
        self.commit_rate.unwrap_or(0.0)
    }

    fn code_rate(&self) -> f64 {
        self.code_rate.unwrap_or(0.0)
    }

    fn contribution_percent(&self) -> f64 {
        self.contribution_percent.unwrap_or(0.0)
    }

    fn fork_count(&self) -> u64 {
        self.fork_count.unwrap_or(0)
    }

    fn star_count(&self) -> u64 {
        self.star_count.unwrap_or(0)
    }

    fn language_byte_counts(&self) -> Option<&LanguageBytes> {
        self.language_byte_counts.as_ref()
    }

    fn follower_count(&self) -> u64 {
        0
    }

    fn repo_count(&self) -> u64 {
        1
    }
}

impl MetricRecord for SubjectMetricSummary {
    fn commentary(&self, field: Commentary) -> Option<&str> {
        let text = match field {
            Commentary::Branch => &self.branch_commentary,
            Commentary::Directory => &self.directory_commentary,
            Commentary::CodeQuality => &self.code_quality_commentary,
            Commentary::ProjectDescription => &self.project_description,
            Commentary::CommitHistory => &self.commit_history_commentary,
            Commentary::Readme => &self.readme_commentary,
        };
        Some(text.as_str())
    }

    fn code_quality_score(&self) -> f64 {
        self.code_quality_score
    }

    fn commit_rate(&self) -> f64 {
        self.commit_rate
    }

    fn code_rate(&self) -> f64 {
        self.code_rate
    }

    fn contribution_percent(&self) -> f64 {
        self.contribution_percent
    }

    fn fork_count(&self) -> u64 {
        self.fork_count
    }

    fn star_count(&self) -> u64 {
        self.star_count
    }

    fn language_byte_counts(&self) -> Option<&LanguageBytes> {
        Some(&self.language_byte_counts)
    }

    fn follower_count(&self) -> u64 {
        self.follower_count
    }

    fn repo_count(&self) -> u64 {
        self.repo_count
    }
}

impl SubjectMetricSummary {
    pub fn commentary_mut(&mut self, field: Commentary) -> &mut String {
        match field {
            Commentary::Branch => &mut self.branch_commentary,
            Commentary::Directory => &mut self.directory_commentary,
            Commentary::CodeQuality => &mut self.code_quality_commentary,
            Commentary::ProjectDescription => &mut self.project_description,
            Commentary::CommitHistory => &mut self.commit_history_commentary,
            Commentary::Readme => &mut self.readme_commentary,
        }
    }
}
