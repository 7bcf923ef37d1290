use std::collections::BTreeSet;

use crate::model::*;

// ── Availability derivation ───────────────────────────────────────

/// Union of occupied dates over the active reservations, ascending and
/// de-duplicated. `window` bounds the expansion — pass one wherever the
/// caller doesn't need the full horizon.
pub fn unavailable_dates(active: &[Reservation], window: Option<&DateRange>) -> Vec<Day> {
    let mut dates = BTreeSet::new();
    for r in active {
        if !r.status.is_active() {
            continue;
        }
        for d in r.range.days() {
            if let Some(w) = window
                && !w.contains_day(d)
            {
                continue;
            }
            dates.insert(d);
        }
    }
    dates.into_iter().collect()
}

/// One inclusive display pair per active reservation, ascending by start.
/// Pairs are never coalesced: write-time admission already rules out
/// overlap among active reservations, and adjacent stays are distinct
/// bookings the calendar should show separately.
pub fn unavailable_ranges(active: &[Reservation]) -> Vec<UnavailableRange> {
    let mut out: Vec<UnavailableRange> = active
        .iter()
        .filter(|r| r.status.is_active())
        .map(|r| UnavailableRange {
            start: r.range.start,
            end: r.range.display_end(),
        })
        .collect();
    out.sort_by_key(|r| r.start);
    out
}

/// True iff some active reservation occupies `date`.
pub fn occupied_on(active: &[Reservation], date: Day) -> bool {
    active
        .iter()
        .any(|r| r.status.is_active() && r.range.contains_day(date))
}
