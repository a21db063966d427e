use serde::{Deserialize, Serialize};

use super::types::{Commentary, MetricRecord, SubjectMetricSummary};

/// Follower and repository totals taken from the subject's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectCounts {
    pub followers: u64,
    pub repositories: u64,
}

/// Fold records into one summary, in the order given.
///
/// Counts are summed, score/rates/percent are averaged over the number of
/// records, commentary is joined with `"\n"` in iteration order and
/// language bytes are summed per language. With `counts` set, follower and
/// repo counts come from it; otherwise they are summed from the records.
/// An empty input yields a zero-valued summary.
pub fn aggregate<'a, R, I>(records: I, counts: Option<SubjectCounts>) -> SubjectMetricSummary
where
    R: MetricRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let records: Vec<&R> = records.into_iter().collect();
    let mut summary = SubjectMetricSummary::default();

    for field in Commentary::ALL {
        let joined = records
            .iter()
            .filter_map(|r| r.commentary(field))
            .collect::<Vec<_>>()
            .join("\n");
        *summary.commentary_mut(field) = joined;
    }

    for record in &records {
        summary.fork_count += record.fork_count();
        summary.star_count += record.star_count();
        summary.code_quality_score += record.code_quality_score();
        summary.commit_rate += record.commit_rate();
        summary.code_rate += record.code_rate();
        summary.contribution_percent += record.contribution_percent();
        summary.follower_count += record.follower_count();
        summary.repo_count += record.repo_count();

        if let Some(languages) = record.language_byte_counts() {
            for (language, bytes) in languages {
                *summary
                    .language_byte_counts
                    .entry(language.clone())
                    .or_insert(0) += bytes;
            }
        }
    }

    if !records.is_empty() {
        let n = records.len() as f64;
        summary.code_quality_score /= n;
        summary.commit_rate /= n;
        summary.code_rate /= n;
        summary.contribution_percent /= n;
    }

    if let Some(counts) = counts {
        summary.follower_count = counts.followers;
        summary.repo_count = counts.repositories;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::analysis::{LanguageBytes, RepoMetricSet, StepOutput};

    fn repo(score: u8, forks: u64, stars: u64, rate: f64, lang: &[(&str, u64)]) -> RepoMetricSet {
        let mut set = RepoMetricSet::new();
        set.apply(StepOutput::Branches(format!("branches {score}")));
        set.apply(StepOutput::Directory("dirs".into()));
        set.apply(StepOutput::CodeQuality {
            commentary: "quality".into(),
            score,
        });
        set.apply(StepOutput::Popularity { forks, stars });
        set.apply(StepOutput::Languages(
            lang.iter().map(|(l, b)| (l.to_string(), *b)).collect(),
        ));
        set.apply(StepOutput::Contribution {
            commit_rate: rate,
            code_rate: rate * 10.0,
            contribution_percent: 100.0,
        });
        set.apply(StepOutput::Description("about".into()));
        set.apply(StepOutput::CommitHistory("commits".into()));
        set.apply(StepOutput::Readme("readme".into()));
        set
    }

    #[test]
    fn test_empty_input_is_zero_summary() {
        let records: BTreeMap<String, RepoMetricSet> = BTreeMap::new();
        let summary = aggregate(records.values(), None);
        assert_eq!(summary, SubjectMetricSummary::default());
        assert_eq!(summary.code_quality_score, 0.0);
    }

    #[test]
    fn test_single_record_is_identity() {
        let record = repo(72, 3, 9, 1.5, &[("Python", 900)]);
        let records = BTreeMap::from([("42".to_string(), record)]);
        let summary = aggregate(
            records.values(),
            Some(SubjectCounts {
                followers: 11,
                repositories: 30,
            }),
        );

        assert_eq!(summary.follower_count, 11);
        assert_eq!(summary.repo_count, 30);
        assert_eq!(summary.branch_commentary, "branches 72");
        assert_eq!(summary.code_quality_score, 72.0);
        assert_eq!(summary.fork_count, 3);
        assert_eq!(summary.star_count, 9);
        assert_eq!(summary.commit_rate, 1.5);
        assert_eq!(summary.code_rate, 15.0);
        assert_eq!(summary.contribution_percent, 100.0);
        assert_eq!(
            summary.language_byte_counts,
            LanguageBytes::from([("Python".to_string(), 900)])
        );
        assert_eq!(summary.readme_commentary, "readme");
    }

    #[test]
    fn test_equal_records_average_to_themselves() {
        let records: BTreeMap<String, RepoMetricSet> = (1..=3)
            .map(|i| (i.to_string(), repo(60, 1, 2, 2.0, &[("Rust", 100)])))
            .collect();
        let summary = aggregate(records.values(), None);

        assert_eq!(summary.code_quality_score, 60.0);
        assert_eq!(summary.commit_rate, 2.0);
        assert_eq!(summary.code_rate, 20.0);
        assert_eq!(summary.fork_count, 3);
        assert_eq!(summary.star_count, 6);
        assert_eq!(summary.language_byte_counts["Rust"], 300);
        assert_eq!(summary.follower_count, 0);
        assert_eq!(summary.repo_count, 3);
        assert_eq!(summary.directory_commentary, "dirs\ndirs\ndirs");
    }

    #[test]
    fn test_languages_merge_across_records() {
        let records = BTreeMap::from([
            ("1".to_string(), repo(50, 0, 0, 0.0, &[("Rust", 10), ("C", 5)])),
            ("2".to_string(), repo(70, 0, 0, 0.0, &[("Rust", 1)])),
        ]);
        let summary = aggregate(records.values(), None);
        assert_eq!(summary.code_quality_score, 60.0);
        assert_eq!(summary.language_byte_counts["Rust"], 11);
        assert_eq!(summary.language_byte_counts["C"], 5);
        assert_eq!(summary.branch_commentary, "branches 50\nbranches 70");
    }

    #[test]
    fn test_commentary_follows_input_order() {
        let first = repo(90, 0, 0, 0.0, &[]);
        let second = repo(10, 0, 0, 0.0, &[]);
        let summary = aggregate([&first, &second], None);
        assert_eq!(summary.branch_commentary, "branches 90\nbranches 10");

        let summary = aggregate([&second, &first], None);
        assert_eq!(summary.branch_commentary, "branches 10\nbranches 90");
    }

    #[test]
    fn test_team_aggregation_sums_member_counts() {
        let alice = SubjectMetricSummary {
            follower_count: 4,
            repo_count: 10,
            code_quality_score: 80.0,
            branch_commentary: "alice".into(),
            ..Default::default()
        };
        let bob = SubjectMetricSummary {
            follower_count: 6,
            repo_count: 2,
            code_quality_score: 40.0,
            branch_commentary: "bob".into(),
            ..Default::default()
        };
        let members = BTreeMap::from([("alice".to_string(), alice), ("bob".to_string(), bob)]);

        let team = aggregate(members.values(), None);
        assert_eq!(team.follower_count, 10);
        assert_eq!(team.repo_count, 12);
        assert_eq!(team.code_quality_score, 60.0);
        assert_eq!(team.branch_commentary, "alice\nbob");
    }
}
