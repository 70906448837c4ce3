// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over the document stage.
//!
//! Queries provide derived views (hit-testing, text search) that power the
//! UI collaborators without mutating the store.

pub mod hit;
pub mod search;

pub use hit::find_entity_by_location;
pub use search::{entity_text_search, fuzzy_rank, TextSearchMode};
