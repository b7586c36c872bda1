use std::collections::BTreeSet;
use chrono::NaiveDate;
use rocket::serde::Serialize;
use crate::booking::Booking;
use crate::slot::SlotTime;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictReason {
    ExistingBooking,
    BlockedSlot,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub reason: ConflictReason,
    pub blocking_time: SlotTime,
}

/// The grid cell a member is trying to book. `date` stays `None` until
/// the date field is filled in; without a date no existing booking can
/// match, only the schedule feed applies.
#[derive(Clone, Debug)]
pub struct SlotCandidate<'a> {
    pub date: Option<NaiveDate>,
    pub location: &'a str,
    pub bay: &'a str,
    pub time: SlotTime,
}

/// Conflict check for a candidate cell, in order:
///
/// 1. an existing booking on the same date/location/bay whose time equals
///    the candidate time or the immediately following slot (first match in
///    insertion order wins),
/// 2. the following slot being on the blocked schedule feed.
///
/// The candidate's own time is never tested against the blocked set here;
/// the grid marks those cells unavailable before selection (see
/// [`cell_state`]).
pub fn find_conflict(
    candidate: &SlotCandidate,
    existing: &[Booking],
    blocked: &BTreeSet<SlotTime>,
) -> Option<Conflict> {
    let next = candidate.time.next();
    if let Some(hit) = existing.iter().find(|b| {
        Some(b.date) == candidate.date
            && b.location == candidate.location
            && b.bay == candidate.bay
            && (b.time == candidate.time || b.time == next)
    }) {
        return Some(Conflict {
            reason: ConflictReason::ExistingBooking,
            blocking_time: hit.time,
        });
    }
    if blocked.contains(&next) {
        return Some(Conflict {
            reason: ConflictReason::BlockedSlot,
            blocking_time: next,
        });
    }
    None
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CellState {
    Open,
    Blocked,
    Chosen,
}

/// How a grid cell renders: the pending selection, a blocked time, or open.
pub fn cell_state(
    time: SlotTime,
    bay: &str,
    selection: Option<(SlotTime, &str)>,
    blocked: &BTreeSet<SlotTime>,
) -> CellState {
    if selection == Some((time, bay)) {
        CellState::Chosen
    } else if blocked.contains(&time) {
        CellState::Blocked
    } else {
        CellState::Open
    }
}
