// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted UI preferences.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user UI state, read when a view initializes and written on each toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Preferences {
    #[serde(default)]
    pub menu_open: bool,
    #[serde(default)]
    pub logout_modal_open: bool,
    #[serde(default)]
    pub dark_mode: bool,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub menu_open: Option<bool>,
    pub logout_modal_open: Option<bool>,
    pub dark_mode: Option<bool>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.menu_open.is_none() && self.logout_modal_open.is_none() && self.dark_mode.is_none()
    }

    pub fn apply(&self, prefs: &mut Preferences) {
        if let Some(v) = self.menu_open {
            prefs.menu_open = v;
        }
        if let Some(v) = self.logout_modal_open {
            prefs.logout_modal_open = v;
        }
        if let Some(v) = self.dark_mode {
            prefs.dark_mode = v;
        }
    }
}
