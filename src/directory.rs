// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User directory filtering and ordering.

use crate::models::User;
use std::cmp::Reverse;

/// Users whose display name contains `search` (case-insensitive),
/// in their original relative order. An empty search matches everyone.
/// Whitespace is matched like any other character.
pub fn filter_by_name<'a>(users: &'a [User], search: &str) -> Vec<&'a User> {
    if search.is_empty() {
        return users.iter().collect();
    }

    let needle = search.to_lowercase();

    users
        .iter()
        .filter(|user| user.display_name().to_lowercase().contains(&needle))
        .collect()
}

/// Sort by most recent activity first. Users without recorded activity
/// count as 0 and end up after active users; ties keep their order.
pub fn sort_by_recency(users: &mut [&User]) {
    users.sort_by_key(|user| Reverse(user.activity()));
}

/// The directory as displayed: filtered, then sorted by recency.
pub fn directory_view<'a>(users: &'a [User], search: &str) -> Vec<&'a User> {
    let mut view = filter_by_name(users, search);
    sort_by_recency(&mut view);
    view
}
