// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-Based Tests: Message Filtering
//!
//! A message passes `can_log` exactly when the logger is enabled, its
//! severity is at or above the threshold and its category bit is set.

use engine_log::logging::{Category, FlushMode, Logger, Severity};
use proptest::prelude::*;
use std::sync::Arc;

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

fn category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

proptest! {
    /// **Property:** `can_log` matches the filter truth table for every
    /// combination of enabled flag, threshold, mask and message.
    #[test]
    fn test_can_log_truth_table(
        enabled in any::<bool>(),
        threshold in severity(),
        mask in any::<u64>(),
        level in severity(),
        category in category(),
    ) {
        let logger = Arc::new(Logger::new());
        logger.init(FlushMode::Sync);
        logger.set_level(threshold);
        logger.set_category_mask(mask);
        if !enabled {
            logger.disable();
        }

        let expected = enabled
            && level.as_u8() <= threshold.as_u8()
            && mask & category.bit() != 0;
        prop_assert_eq!(logger.can_log(level, category), expected);
    }

    /// **Property:** toggling a category only changes that category's bit.
    #[test]
    fn test_toggle_category_touches_one_bit(
        mask in any::<u64>(),
        category in category(),
        enable in any::<bool>(),
    ) {
        let logger = Logger::new();
        logger.set_category_mask(mask);
        logger.toggle_category(category, enable);

        let bit = category.bit();
        prop_assert_eq!(logger.category_mask() & !bit, mask & !bit);
        prop_assert_eq!(logger.category_mask() & bit != 0, enable);
    }
}
