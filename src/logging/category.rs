// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging categories (which part of the engine produced a message)

use serde::{Deserialize, Serialize};

/// Bitmask with one bit per [`Category`]
pub type CategoryMask = u64;

/// Mask with every category enabled
pub const ALL_CATEGORIES: CategoryMask = CategoryMask::MAX;

/// Logging category - identifies the engine layer a message came from
///
/// Each category owns one bit of the logger's 64-bit category mask.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Engine foundation: threads, memory, platform
    Core = 0,
    /// Game code built on top of the engine
    Game = 1,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Core, Category::Game];

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// This category's bit in a [`CategoryMask`]
    #[inline]
    pub const fn bit(self) -> CategoryMask {
        1 << self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Core => "Core",
            Category::Game => "Game",
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Category::Core),
            1 => Some(Category::Game),
            _ => None,
        }
    }

    /// Look a category up by its display name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
