/*
 * Copyright (C) 2025 Language Learner Developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::str::FromStr;

use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};

/// Timestamp format used for every stored timestamp. RFC 3339 in UTC with
/// millisecond precision, so lexicographic order is chronological order.
pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now() -> String {
    timestamp(Utc::now())
}

/// A named recency window applied to list queries over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Day,
    Week,
    Biweekly,
    Month,
}

impl DateFilter {
    /// Lower bound for the window, or `None` for `All`. Month subtraction is
    /// simple calendar arithmetic clamped at month ends, not calendar-aware
    /// beyond that.
    pub fn threshold(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateFilter::All => None,
            DateFilter::Day => Some(now - Duration::days(1)),
            DateFilter::Week => Some(now - Duration::days(7)),
            DateFilter::Biweekly => Some(now - Duration::days(14)),
            DateFilter::Month => Some(now.checked_sub_months(Months::new(1)).unwrap_or(now)),
        }
    }
}

impl FromStr for DateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(DateFilter::All),
            "day" => Ok(DateFilter::Day),
            "week" => Ok(DateFilter::Week),
            "biweekly" => Ok(DateFilter::Biweekly),
            "month" => Ok(DateFilter::Month),
            other => Err(format!("unknown date_filter \"{}\"", other)),
        }
    }
}
