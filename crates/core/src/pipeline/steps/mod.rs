//! The metric steps, one per output field group.

mod branches;
mod code_quality;
mod directory;
mod narrative;
mod repository;

pub use branches::{BranchesStep, SINGLE_BRANCH};
pub use code_quality::CodeQualityStep;
pub use directory::DirectoryStep;
pub use narrative::{CommitHistoryStep, DescriptionStep, ReadmeStep, NO_COMMITS, NO_README};
pub use repository::{contribution_rates, ContributionStep, LanguagesStep, PopularityStep};
