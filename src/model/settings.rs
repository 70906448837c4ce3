// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

/// Feature toggles consumed by the document core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingFlag {
    EnableEntityCollision,
    AllowAddCycleEdge,
}

type WatchCallback = Box<dyn FnMut(bool)>;

/// The settings collaborator: current toggle values plus watch callbacks.
///
/// The host runs single-threaded; callbacks fire synchronously from `set`.
pub struct Settings {
    enable_entity_collision: bool,
    allow_add_cycle_edge: bool,
    watchers: Vec<(SettingFlag, WatchCallback)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_entity_collision: true,
            allow_add_cycle_edge: false,
            watchers: Vec::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("enable_entity_collision", &self.enable_entity_collision)
            .field("allow_add_cycle_edge", &self.allow_add_cycle_edge)
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: SettingFlag) -> bool {
        match flag {
            SettingFlag::EnableEntityCollision => self.enable_entity_collision,
            SettingFlag::AllowAddCycleEdge => self.allow_add_cycle_edge,
        }
    }

    pub fn set(&mut self, flag: SettingFlag, value: bool) {
        let slot = match flag {
            SettingFlag::EnableEntityCollision => &mut self.enable_entity_collision,
            SettingFlag::AllowAddCycleEdge => &mut self.allow_add_cycle_edge,
        };
        if *slot == value {
            return;
        }
        *slot = value;

        for (watched, callback) in &mut self.watchers {
            if *watched == flag {
                callback(value);
            }
        }
    }

    pub fn watch(&mut self, flag: SettingFlag, callback: impl FnMut(bool) + 'static) {
        self.watchers.push((flag, Box::new(callback)));
    }

    pub fn is_enable_entity_collision(&self) -> bool {
        self.enable_entity_collision
    }

    pub fn allow_add_cycle_edge(&self) -> bool {
        self.allow_add_cycle_edge
    }
}
