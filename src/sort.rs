use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::models::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    /// Likelihood rating first, rejected applications last
    #[default]
    Likelihood,
    /// Newest applications first, rejected applications last
    Date,
    /// Interview, Recruiter, Applied, Rejected, then anything else
    Status,
}

impl SortMethod {
    pub fn next(self) -> Self {
        match self {
            SortMethod::Likelihood => SortMethod::Date,
            SortMethod::Date => SortMethod::Status,
            SortMethod::Status => SortMethod::Likelihood,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMethod::Likelihood => "likelihood",
            SortMethod::Date => "date",
            SortMethod::Status => "status",
        }
    }
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns a sorted copy. `sort_by` is stable, so records that compare equal
/// keep their input order.
pub fn sort_records(records: &[JobRecord], method: SortMethod) -> Vec<JobRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare(a, b, method));
    sorted
}

pub fn compare(a: &JobRecord, b: &JobRecord, method: SortMethod) -> Ordering {
    match method {
        SortMethod::Likelihood => rejected_last(a, b).then_with(|| {
            if a.is_rejected() && b.is_rejected() {
                newest_first(a, b)
            } else {
                highest_rating_first(a, b).then_with(|| newest_first(a, b))
            }
        }),
        SortMethod::Date => rejected_last(a, b).then_with(|| newest_first(a, b)),
        SortMethod::Status => a
            .status
            .priority()
            .cmp(&b.status.priority())
            .then_with(|| highest_rating_first(a, b))
            .then_with(|| newest_first(a, b)),
    }
}

fn rejected_last(a: &JobRecord, b: &JobRecord) -> Ordering {
    a.is_rejected().cmp(&b.is_rejected())
}

fn highest_rating_first(a: &JobRecord, b: &JobRecord) -> Ordering {
    b.likelihood_rating.cmp(&a.likelihood_rating)
}

// `None` orders below every date, so unparsable dates end up oldest.
fn newest_first(a: &JobRecord, b: &JobRecord) -> Ordering {
    b.applied_on().cmp(&a.applied_on())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, record};

    fn ids(records: &[JobRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    fn mixed() -> Vec<JobRecord> {
        vec![
            record(1, Status::Rejected, 5, "2024-02-01"),
            record(2, Status::Applied, 1, "2024-03-01"),
            record(3, Status::Interview, 4, "2023-12-01"),
            record(4, Status::Other("Ghosted".to_string()), 5, "2024-04-01"),
            record(5, Status::Recruiter, 4, "not a date"),
            record(6, Status::Rejected, 0, "2024-05-01"),
            record(7, Status::Applied, 4, "2024-01-15"),
            record(8, Status::Recruiter, 2, ""),
        ]
    }

    #[test]
    fn test_likelihood_example_order() {
        let records = vec![
            record(1, Status::Applied, 3, "2024-01-01"),
            record(2, Status::Rejected, 5, "2024-06-01"),
            record(3, Status::Applied, 3, "2024-05-01"),
        ];
        assert_eq!(ids(&sort_records(&records, SortMethod::Likelihood)), vec![3, 1, 2]);
    }

    #[test]
    fn test_likelihood_puts_rejected_last() {
        let sorted = sort_records(&mixed(), SortMethod::Likelihood);
        let first_rejected = sorted.iter().position(|r| r.is_rejected()).unwrap();
        assert!(sorted[first_rejected..].iter().all(|r| r.is_rejected()));
        // Rejected among themselves are newest first regardless of rating.
        assert_eq!(ids(&sorted[first_rejected..]), vec![6, 1]);
    }

    #[test]
    fn test_likelihood_orders_by_rating_then_date() {
        let sorted = sort_records(&mixed(), SortMethod::Likelihood);
        // 4 (rating 5), then the rating-4 group newest first with the bad date last.
        assert_eq!(ids(&sorted), vec![4, 7, 3, 5, 8, 2, 6, 1]);
        for pair in sorted.windows(2) {
            if !pair[0].is_rejected() && !pair[1].is_rejected() {
                assert!(pair[0].likelihood_rating >= pair[1].likelihood_rating);
            }
        }
    }

    #[test]
    fn test_date_ignores_rating() {
        let sorted = sort_records(&mixed(), SortMethod::Date);
        assert_eq!(ids(&sorted), vec![4, 2, 7, 3, 5, 8, 6, 1]);
    }

    #[test]
    fn test_status_priority() {
        let sorted = sort_records(&mixed(), SortMethod::Status);
        assert_eq!(ids(&sorted), vec![3, 5, 8, 7, 2, 1, 6, 4]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        for method in [SortMethod::Likelihood, SortMethod::Date, SortMethod::Status] {
            let once = sort_records(&mixed(), method);
            let twice = sort_records(&once, method);
            assert_eq!(once, twice, "{} sort not idempotent", method);
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            record(10, Status::Applied, 2, "2024-01-01"),
            record(11, Status::Applied, 2, "2024-01-01"),
            record(12, Status::Applied, 2, "bogus"),
            record(13, Status::Applied, 2, "also bogus"),
        ];
        for method in [SortMethod::Likelihood, SortMethod::Date, SortMethod::Status] {
            assert_eq!(ids(&sort_records(&records, method)), vec![10, 11, 12, 13]);
        }
    }

    #[test]
    fn test_sort_does_not_mutate_input() {
        let records = mixed();
        let before = records.clone();
        let _ = sort_records(&records, SortMethod::Status);
        assert_eq!(records, before);
    }

    #[test]
    fn test_sort_method_cycles() {
        assert_eq!(SortMethod::Likelihood.next(), SortMethod::Date);
        assert_eq!(SortMethod::Status.next(), SortMethod::Likelihood);
        assert_eq!(SortMethod::default(), SortMethod::Likelihood);
    }
}
