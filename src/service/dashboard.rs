use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee::Gender;
use crate::model::timekeeping::TimeRecord;
use crate::service::attendance::Classification;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct GenderStats {
    pub men: u64,
    pub women: u64,
    pub other: u64,
}

impl GenderStats {
    pub fn tally(genders: impl IntoIterator<Item = Gender>) -> Self {
        genders.into_iter().fold(Self::default(), |mut acc, g| {
            match g {
                Gender::Male => acc.men += 1,
                Gender::Female => acc.women += 1,
                Gender::Other => acc.other += 1,
            }
            acc
        })
    }
}

/// Headline numbers shown above the dashboard lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Kpis {
    /// Distinct employees with a check-in.
    pub attendance: usize,
    pub late_arrivals: usize,
    pub missing_punch: usize,
    pub leave_requests: usize,
}

impl Kpis {
    pub fn compute(records: &[TimeRecord], buckets: &Classification, leave_requests: usize) -> Self {
        let attendance = records
            .iter()
            .filter(|r| r.checkin.is_some())
            .map(|r| r.employee.employee_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        Kpis {
            attendance,
            late_arrivals: buckets.late_arrivals.len(),
            missing_punch: buckets.missing_punch.len(),
            leave_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timekeeping::EmployeeRef;
    use crate::service::attendance::{AttendanceClassifier, AttendancePolicy};
    use chrono::NaiveDate;

    fn record(id: &str, checkin_hour: Option<u32>, checkout_hour: Option<u32>) -> TimeRecord {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        TimeRecord {
            employee: EmployeeRef {
                employee_id: id.into(),
                full_name: id.into(),
                avatar_url: None,
            },
            date,
            checkin: checkin_hour.map(|h| date.and_hms_opt(h, 0, 0).unwrap()),
            checkout: checkout_hour.map(|h| date.and_hms_opt(h, 0, 0).unwrap()),
        }
    }

    #[test]
    fn attendance_counts_distinct_checked_in_employees() {
        let records = vec![
            record("E1", Some(7), Some(17)),
            record("E1", Some(9), None),
            record("E2", Some(10), Some(18)),
            record("E3", None, Some(17)),
        ];
        let classifier = AttendanceClassifier::new(AttendancePolicy::default(), "/a.png");
        let buckets = classifier.classify(&records);

        let kpis = Kpis::compute(&records, &buckets, 4);
        assert_eq!(
            kpis,
            Kpis {
                attendance: 2,
                late_arrivals: 1,
                missing_punch: 2,
                leave_requests: 4,
            }
        );
    }

    #[test]
    fn gender_tally() {
        let stats = GenderStats::tally([Gender::Male, Gender::Female, Gender::Male, Gender::Other]);
        assert_eq!(stats, GenderStats { men: 2, women: 1, other: 1 });
    }
}
