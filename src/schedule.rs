//! Milestone templates generated when a series is created.

use chrono::{Duration, NaiveDate};

/// Pre-shoot checklist keyed by weeks before the shoot.
pub const PRE_SHOOT_TEMPLATE: [(i64, &str); 10] = [
    (-5, "Ideation: Generate 10–20 ideas"),
    (-5, "Fixer Search: Interview candidates"),
    (-4, "Lock Episodes (90% confirmed)"),
    (-4, "Thumbnail Concepts Ready"),
    (-3, "All Locations Confirmed"),
    (-3, "Photo/Video Proof from Fixer"),
    (-2, "Book Flights & Hotels"),
    (-2, "Daily Fixer Comms Established"),
    (-1, "Packing Checklist Complete"),
    (-1, "Final Confirmation Call"),
];

/// The four production phases tracked on the board, in week order.
pub const PHASE_TITLES: [&str; 4] = ["Pre-Production", "Shooting", "Editing", "Publish"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMilestone {
    pub week_number: i64,
    pub title: String,
    pub due_date: Option<String>,
}

pub fn pre_shoot_milestones(shoot_start: NaiveDate) -> Vec<PlannedMilestone> {
    PRE_SHOOT_TEMPLATE
        .iter()
        .map(|(week, title)| PlannedMilestone {
            week_number: *week,
            title: (*title).to_string(),
            due_date: Some(
                (shoot_start + Duration::days(week * 7))
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
        })
        .collect()
}

/// Phase milestones for weeks 1-4. `dates` lines up with [`PHASE_TITLES`].
pub fn phase_milestones(dates: [Option<String>; 4]) -> Vec<PlannedMilestone> {
    PHASE_TITLES
        .iter()
        .zip(dates)
        .enumerate()
        .map(|(i, (title, due))| PlannedMilestone {
            week_number: i as i64 + 1,
            title: (*title).to_string(),
            due_date: due,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pre_shoot_dates_count_back_from_shoot() {
        let shoot = NaiveDate::from_ymd_opt(2025, 6, 30).expect("date");
        let ms = pre_shoot_milestones(shoot);
        assert_eq!(ms.len(), 10);
        assert_eq!(ms[0].week_number, -5);
        assert_eq!(ms[0].due_date.as_deref(), Some("2025-05-26"));
        assert_eq!(ms[9].title, "Final Confirmation Call");
        assert_eq!(ms[9].due_date.as_deref(), Some("2025-06-23"));
        assert!(ms.windows(2).all(|w| w[0].due_date <= w[1].due_date));
    }

    #[test]
    fn phase_milestones_are_weeks_one_to_four() {
        let ms = phase_milestones([Some("2025-01-01".into()), None, None, Some("2025-03-01".into())]);
        let got: Vec<(i64, &str, Option<&str>)> = ms
            .iter()
            .map(|m| (m.week_number, m.title.as_str(), m.due_date.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                (1, "Pre-Production", Some("2025-01-01")),
                (2, "Shooting", None),
                (3, "Editing", None),
                (4, "Publish", Some("2025-03-01")),
            ]
        );
    }
}
