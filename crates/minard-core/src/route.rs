//! Route assembly: ordering troop positions into legs and pairing
//! consecutive positions into segments.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::records::{cmp_sequence, Direction, TroopRecord};
use crate::scale::LinewidthScale;
use crate::table::Table;

/// Columns whose presence switches on grouped route assembly. The sequence
/// column is optional: without it each leg keeps file order.
pub const GROUPING_COLUMNS: [&str; 2] = ["group", "direction"];

/// One line between two consecutive positions of the same leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub from: (f64, f64),
    pub to: (f64, f64),
    /// Stroke width in points.
    pub width: f64,
    pub direction: Direction,
}

impl Segment {
    pub fn is_drawable(&self) -> bool {
        [self.from.0, self.from.1, self.to.0, self.to.1, self.width]
            .iter()
            .all(|v| v.is_finite())
    }
}

pub fn has_grouping(table: &Table) -> bool {
    GROUPING_COLUMNS.iter().all(|c| table.has_column(c))
}

/// Key ordering legs the way a dataframe group-by does: by group number,
/// then by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LegKey {
    group: GroupId,
    direction: Direction,
}

/// Total order over finite group ids.
#[derive(Debug, Clone, Copy)]
struct GroupId(f64);

impl PartialEq for GroupId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for GroupId {}

impl PartialOrd for GroupId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Split troop positions into ordered legs.
///
/// With `grouped`, rows are bucketed by (group, direction) and each bucket
/// is stably sorted by sequence (file order when there is none); rows lacking
/// a group or direction belong to no leg.
/// Without it, all rows form one advancing leg, sorted by sequence when any
/// row carries one.
pub fn legs(troops: &[TroopRecord], grouped: bool) -> Vec<(Direction, Vec<&TroopRecord>)> {
    if !grouped {
        let mut leg: Vec<&TroopRecord> = troops.iter().collect();
        if troops.iter().any(|t| t.sequence.is_some()) {
            leg.sort_by(|a, b| cmp_sequence(a.sequence, b.sequence));
        }
        return vec![(Direction::Advance, leg)];
    }

    let mut buckets: BTreeMap<LegKey, Vec<&TroopRecord>> = BTreeMap::new();
    for t in troops {
        let (Some(group), Some(direction)) = (t.group, t.direction) else {
            continue;
        };
        buckets
            .entry(LegKey { group: GroupId(group), direction })
            .or_default()
            .push(t);
    }
    buckets
        .into_iter()
        .map(|(key, mut leg)| {
            leg.sort_by(|a, b| cmp_sequence(a.sequence, b.sequence));
            (key.direction, leg)
        })
        .collect()
}

/// Segments of every leg, in drawing order. Widths come from `scale`;
/// segments with missing coordinates or counts are kept here and filtered
/// by [`Segment::is_drawable`] at layout time.
pub fn segments(troops: &[TroopRecord], grouped: bool, scale: &LinewidthScale) -> Vec<Segment> {
    legs(troops, grouped)
        .into_iter()
        .flat_map(|(direction, leg)| {
            leg.windows(2)
                .map(|pair| Segment {
                    from: (pair[0].longitude, pair[0].latitude),
                    to: (pair[1].longitude, pair[1].latitude),
                    width: scale.segment_width(pair[0].survivors, pair[1].survivors),
                    direction,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
