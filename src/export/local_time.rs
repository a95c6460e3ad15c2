use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Maps wall-clock readings onto instants.
///
/// An ambiguous time is resolved to the earlier instant when seen first, and to the later one when
/// it repeats, which follows the order the readings are written in on a fall-back day.
pub struct LocalTimeResolver {
    time_zone: Tz,
    seen_ambiguous: HashSet<NaiveDateTime>,
}

impl LocalTimeResolver {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone, seen_ambiguous: HashSet::new() }
    }

    /// Returns `None` for a wall-clock time skipped by a spring-forward transition.
    pub fn resolve(&mut self, local: NaiveDateTime) -> Option<DateTime<Tz>> {
        match self.time_zone.from_local_datetime(&local) {
            LocalResult::Single(timestamp) => Some(timestamp),
            LocalResult::Ambiguous(earliest, latest) => {
                Some(if self.seen_ambiguous.insert(local) { earliest } else { latest })
            }
            LocalResult::None => None,
        }
    }

    /// Resolve a time written with its UTC offset, which is trusted as is.
    pub fn resolve_with_offset(
        &mut self,
        local: NaiveDateTime,
        offset: FixedOffset,
    ) -> Option<DateTime<Tz>> {
        let timestamp = offset.from_local_datetime(&local).single()?.with_timezone(&self.time_zone);
        if let LocalResult::Ambiguous(earliest, _) = self.time_zone.from_local_datetime(&local)
            && earliest == timestamp
        {
            self.seen_ambiguous.insert(local);
        }
        Some(timestamp)
    }

    pub const fn time_zone(&self) -> Tz {
        self.time_zone
    }
}
