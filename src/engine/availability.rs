use crate::config::ScheduleConfig;
use crate::model::{MINUTES_PER_DAY, Minutes, TimeRange};

// ── Interval algebra ─────────────────────────────────────────────

/// Merge overlapping/adjacent intervals into sorted disjoint intervals.
pub fn merge_ranges(mut ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<TimeRange> = Vec::new();
    for range in ranges {
        if let Some(last) = merged.last_mut()
            && range.start <= last.end
        {
            last.end = last.end.max(range.end);
            continue;
        }
        merged.push(range);
    }
    merged
}

/// Free intervals inside `window` once the merged busy intervals are removed.
/// Walks the busy list left to right emitting the gaps.
pub fn free_within(window: TimeRange, busy_merged: &[TimeRange]) -> Vec<TimeRange> {
    let mut free = Vec::new();
    let mut cursor = window.start;
    for busy in busy_merged {
        if busy.end <= window.start || busy.start >= window.end {
            continue;
        }
        let clamped_start = busy.start.max(window.start);
        if clamped_start > cursor {
            free.push(TimeRange::new(cursor, clamped_start));
        }
        cursor = cursor.max(busy.end.min(window.end));
    }
    if cursor < window.end {
        free.push(TimeRange::new(cursor, window.end));
    }
    free
}

/// True when `slot` touches no busy interval (half-open semantics).
pub fn slot_is_free(busy_merged: &[TimeRange], slot: &TimeRange) -> bool {
    busy_merged.iter().all(|b| !b.overlaps(slot))
}

// ── Slot grid ────────────────────────────────────────────────────

/// The fixed set of bookable start and end times inside the operating
/// window, generated from per-hour minute offsets. Start offsets sit one
/// minute past end offsets so a booking ending at HH:15 and the next
/// starting at HH:16 never share a minute.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    pub starts: Vec<Minutes>,
    pub ends: Vec<Minutes>,
}

impl SlotGrid {
    pub fn generate(cfg: &ScheduleConfig) -> Self {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for hour in 0..24u16 {
            for &off in &cfg.slot_start_offsets {
                let t = hour * 60 + off;
                if t >= cfg.open && t < cfg.close {
                    starts.push(t);
                }
            }
            for &off in &cfg.slot_end_offsets {
                let t = hour * 60 + off; // off == 60 spills into the next hour
                if t > cfg.open && t <= cfg.close && t <= MINUTES_PER_DAY {
                    ends.push(t);
                }
            }
        }
        starts.sort_unstable();
        ends.sort_unstable();
        Self { starts, ends }
    }

    /// Grid start times a caller may pick: inside the window, outside every
    /// busy interval, strictly after `not_before` (same-day "now" cutoff)
    /// when given, and with at least one selectable end.
    pub fn selectable_starts(
        &self,
        window: TimeRange,
        busy_merged: &[TimeRange],
        not_before: Option<Minutes>,
    ) -> Vec<Minutes> {
        self.starts
            .iter()
            .copied()
            .filter(|&s| window.contains(s))
            .filter(|&s| not_before.is_none_or(|cutoff| s > cutoff))
            .filter(|&s| !busy_merged.iter().any(|b| b.contains(s)))
            .filter(|&s| !self.selectable_ends(window, busy_merged, s).is_empty())
            .collect()
    }

    /// Grid end times valid for a booking starting at `start`: strictly
    /// greater, inside the window, and leaving `[start, end)` clear of every
    /// busy interval. Ends may touch the next busy interval's start.
    pub fn selectable_ends(
        &self,
        window: TimeRange,
        busy_merged: &[TimeRange],
        start: Minutes,
    ) -> Vec<Minutes> {
        self.ends
            .iter()
            .copied()
            .filter(|&e| e > start && e <= window.end)
            .filter(|&e| slot_is_free(busy_merged, &TimeRange::new(start, e)))
            .collect()
    }
}
