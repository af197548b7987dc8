//! Year roadmap: places each open series on a producer and a display track,
//! then lays out pre-production, shoot, staggered edits and weekly publishes.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

const PREPROD_WEEKS: i64 = 5;
const SHOOT_WEEKS: i64 = 2;
const EDIT_WEEKS_PER_EP: i64 = 2;
const EDIT_STAGGER_WEEKS: i64 = 1;

const COLOR_PALETTE: [&str; 3] = ["#4DD0E1", "#F59E0B", "#60A5FA"];

#[derive(Debug, Clone)]
pub struct SeriesInput {
    pub id: i64,
    pub title: String,
    pub target_shoot_start: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct EpisodeInput {
    pub id: i64,
    pub series_id: i64,
    pub title: String,
    pub episode_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBlock {
    pub episode_id: i64,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub editor_slot: usize,
    pub index: usize,
    pub episode_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBlock {
    pub episode_id: i64,
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub index: usize,
    pub publish_date: NaiveDate,
    pub episode_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSeries {
    pub id: i64,
    pub title: String,
    pub track: usize,
    pub color: &'static str,
    pub producer_index: usize,
    pub preprod: Span,
    pub shoot: Span,
    pub edits: Vec<EditBlock>,
    pub publishes: Vec<PublishBlock>,
    pub block: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    pub month: u32,
    pub month_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub id: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub weeks: Vec<Week>,
    pub tracks: Vec<TrackInfo>,
    pub series: Vec<ScheduledSeries>,
    pub producer_count: usize,
    pub year: i32,
}

struct Track {
    id: usize,
    last_end: NaiveDate,
    last_color: Option<usize>,
}

struct Range {
    start: NaiveDate,
    end: NaiveDate,
    next_start: NaiveDate,
}

fn weeks(n: i64) -> Duration {
    Duration::days(n * 7)
}

fn range_from_weeks(start: NaiveDate, n: i64) -> Range {
    Range {
        start,
        end: start + Duration::days(n * 7 - 1),
        next_start: start + weeks(n),
    }
}

fn start_of_week(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}

fn next_saturday(d: NaiveDate) -> NaiveDate {
    let ahead = (Weekday::Sat.num_days_from_sunday() + 7 - d.weekday().num_days_from_sunday()) % 7;
    d + Duration::days(ahead as i64)
}

/// `producers` is clamped to 1 or 2. `series` must already be in scheduling
/// order (dated series first, by target shoot start).
pub fn build(
    series: &[SeriesInput],
    episodes: &[EpisodeInput],
    producers: usize,
    today: NaiveDate,
) -> Roadmap {
    let producer_count = if producers >= 2 { 2 } else { 1 };

    let mut by_series: HashMap<i64, Vec<&EpisodeInput>> = HashMap::new();
    for ep in episodes {
        by_series.entry(ep.series_id).or_default().push(ep);
    }

    let base = series
        .iter()
        .filter_map(|s| s.target_shoot_start)
        .min()
        .map(|d| d - weeks(PREPROD_WEEKS))
        .unwrap_or(today);
    let mut availability = vec![base; producer_count];
    let mut tracks: Vec<Track> = Vec::new();
    let mut scheduled = Vec::with_capacity(series.len());

    for s in series {
        let candidate = s.target_shoot_start.map(|d| d - weeks(PREPROD_WEEKS));
        let earliest_for = |avail: NaiveDate| candidate.map_or(avail, |c| avail.max(c));

        let mut producer = 0;
        let mut start = earliest_for(availability[0]);
        for (i, avail) in availability.iter().enumerate().skip(1) {
            let c = earliest_for(*avail);
            if c < start {
                start = c;
                producer = i;
            }
        }

        let preprod = range_from_weeks(start, PREPROD_WEEKS);
        let shoot = range_from_weeks(preprod.next_start, SHOOT_WEEKS);
        let edit_base = shoot.next_start;

        let edits: Vec<EditBlock> = by_series
            .get(&s.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, ep)| {
                let start = edit_base + weeks(index as i64 * EDIT_STAGGER_WEEKS);
                EditBlock {
                    episode_id: ep.id,
                    title: ep.title.clone(),
                    start,
                    end: start + Duration::days(EDIT_WEEKS_PER_EP * 7 - 1),
                    editor_slot: index % 2,
                    index,
                    episode_type: ep.episode_type.clone(),
                }
            })
            .collect();

        let first_edit_end = edits
            .first()
            .map(|e| e.end)
            .unwrap_or_else(|| edit_base + Duration::days(EDIT_WEEKS_PER_EP * 7 - 1));
        let publish_start = next_saturday(first_edit_end);
        let publishes: Vec<PublishBlock> = edits
            .iter()
            .enumerate()
            .map(|(index, edit)| {
                let date = publish_start + weeks(index as i64);
                PublishBlock {
                    episode_id: edit.episode_id,
                    title: edit.title.clone(),
                    start: date,
                    end: date + Duration::days(6),
                    index,
                    publish_date: date,
                    episode_type: edit.episode_type.clone(),
                }
            })
            .collect();

        availability[producer] = preprod.next_start;

        let block = Span {
            start: preprod.start,
            end: publishes.last().map(|p| p.end).unwrap_or(shoot.end),
        };

        let free = tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.last_end <= block.start)
            .min_by_key(|(_, t)| t.last_end)
            .map(|(i, _)| i);
        let track_idx = match free {
            Some(i) => {
                tracks[i].last_end = block.end;
                i
            }
            None => {
                tracks.push(Track {
                    id: tracks.len() + 1,
                    last_end: block.end,
                    last_color: None,
                });
                tracks.len() - 1
            }
        };
        let track = &mut tracks[track_idx];
        let color = track.last_color.map_or(0, |c| (c + 1) % COLOR_PALETTE.len());
        track.last_color = Some(color);

        scheduled.push(ScheduledSeries {
            id: s.id,
            title: s.title.clone(),
            track: track.id,
            color: COLOR_PALETTE[color],
            producer_index: producer,
            preprod: Span {
                start: preprod.start,
                end: preprod.end,
            },
            shoot: Span {
                start: shoot.start,
                end: shoot.end,
            },
            edits,
            publishes,
            block,
        });
    }

    let year = today.year();
    Roadmap {
        weeks: year_weeks(year),
        tracks: tracks
            .iter()
            .map(|t| TrackInfo {
                id: t.id,
                label: format!("Track {}", t.id),
            })
            .collect(),
        series: scheduled,
        producer_count,
        year,
    }
}

/// Monday-aligned weeks covering the whole calendar year.
pub fn year_weeks(year: i32) -> Vec<Week> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Vec::new();
    };
    let last_start = start_of_week(last);
    let mut out = Vec::with_capacity(54);
    let mut cursor = start_of_week(first);
    while cursor <= last_start {
        let index = out.len();
        out.push(Week {
            index,
            start: cursor,
            end: cursor + Duration::days(6),
            label: format!("W{}", index + 1),
            month: cursor.month0(),
            month_label: cursor.format("%b").to_string(),
        });
        cursor += weeks(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn series(id: i64, shoot: Option<&str>) -> SeriesInput {
        SeriesInput {
            id,
            title: format!("S{}", id),
            target_shoot_start: shoot.map(d),
        }
    }

    fn episodes(series_id: i64, n: i64) -> Vec<EpisodeInput> {
        (0..n)
            .map(|i| EpisodeInput {
                id: series_id * 100 + i,
                series_id,
                title: format!("E{}", i + 1),
                episode_type: "cornerstone".into(),
            })
            .collect()
    }

    #[test]
    fn helpers() {
        assert_eq!(start_of_week(d("2025-01-01")), d("2024-12-30"));
        assert_eq!(start_of_week(d("2024-12-30")), d("2024-12-30"));
        assert_eq!(next_saturday(d("2025-03-13")), d("2025-03-15"));
        assert_eq!(next_saturday(d("2025-03-15")), d("2025-03-15"));
    }

    #[test]
    fn single_series_layout() {
        // Shoot Mon 2025-03-03 -> preprod from 2025-01-27.
        let map = build(
            &[series(1, Some("2025-03-03"))],
            &episodes(1, 3),
            1,
            d("2025-01-10"),
        );
        let s = &map.series[0];
        assert_eq!(s.preprod, Span { start: d("2025-01-27"), end: d("2025-03-02") });
        assert_eq!(s.shoot, Span { start: d("2025-03-03"), end: d("2025-03-16") });
        let edit_starts: Vec<NaiveDate> = s.edits.iter().map(|e| e.start).collect();
        assert_eq!(edit_starts, vec![d("2025-03-17"), d("2025-03-24"), d("2025-03-31")]);
        assert_eq!(s.edits[0].end, d("2025-03-30"));
        assert_eq!(s.edits[1].editor_slot, 1);
        // First edit ends Sun 03-30, so publishing starts Sat 04-05.
        let pubs: Vec<NaiveDate> = s.publishes.iter().map(|p| p.publish_date).collect();
        assert_eq!(pubs, vec![d("2025-04-05"), d("2025-04-12"), d("2025-04-19")]);
        assert_eq!(s.block, Span { start: d("2025-01-27"), end: d("2025-04-25") });
        assert_eq!(s.color, "#4DD0E1");
        assert_eq!(map.year, 2025);
    }

    #[test]
    fn one_producer_serializes_preproduction() {
        let map = build(
            &[series(1, Some("2025-03-03")), series(2, Some("2025-03-03"))],
            &[],
            1,
            d("2025-01-10"),
        );
        assert_eq!(map.series[1].preprod.start, d("2025-03-03"));
        assert_eq!(map.series[1].producer_index, 0);
        // Overlapping blocks need a second track.
        assert_eq!(map.series[1].track, 2);
        assert_eq!(map.tracks.len(), 2);
    }

    #[test]
    fn two_producers_run_in_parallel() {
        let map = build(
            &[series(1, Some("2025-03-03")), series(2, Some("2025-03-03"))],
            &[],
            2,
            d("2025-01-10"),
        );
        assert_eq!(map.producer_count, 2);
        assert_eq!(map.series[1].preprod.start, d("2025-01-27"));
        assert_eq!(map.series[1].producer_index, 1);
    }

    #[test]
    fn track_reuse_rotates_colour() {
        let map = build(
            &[series(1, Some("2025-03-03")), series(2, Some("2025-09-01"))],
            &[],
            1,
            d("2025-01-10"),
        );
        assert_eq!(map.series[1].track, 1);
        assert_eq!(map.series[1].color, "#F59E0B");
    }

    #[test]
    fn undated_series_start_when_producer_frees_up() {
        let map = build(&[series(1, None)], &episodes(1, 1), 1, d("2025-05-05"));
        assert_eq!(map.series[0].preprod.start, d("2025-05-05"));
    }

    #[test]
    fn weeks_cover_the_year() {
        let w = year_weeks(2025);
        assert_eq!(w[0].start, d("2024-12-30"));
        assert_eq!(w[0].label, "W1");
        assert_eq!(w[0].month, 11);
        assert_eq!(w.last().map(|w| w.start), Some(d("2025-12-29")));
        assert_eq!(w.len(), 53);
    }
}
