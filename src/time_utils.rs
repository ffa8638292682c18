// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format milliseconds since epoch; `None` if out of range.
pub fn format_millis_rfc3339(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(format_utc_rfc3339)
}
