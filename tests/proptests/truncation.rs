// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-Based Tests: Message Truncation
//!
//! Messages of any length and content are stored as the longest prefix
//! that fits the entry buffer without splitting a character.

use engine_log::logging::{
    format_log_message, Category, LogEntry, Severity, LOG_MESSAGE_CAPACITY,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// **Property:** the stored message is a prefix of the input, at most
    /// `LOG_MESSAGE_CAPACITY - 1` bytes, and only shorter than that when the
    /// next character would not fit.
    #[test]
    fn test_message_is_longest_fitting_prefix(
        text in prop::collection::vec(any::<char>(), 0..3000)
            .prop_map(|chars| chars.into_iter().collect::<String>()),
    ) {
        let entry = LogEntry::new(Severity::Info, Category::Core, &text);
        let stored = entry.get_message();

        prop_assert!(text.starts_with(stored));
        prop_assert!(stored.len() < LOG_MESSAGE_CAPACITY);
        if stored.len() < text.len() {
            let next = text[stored.len()..].chars().next().unwrap();
            prop_assert!(stored.len() + next.len_utf8() > LOG_MESSAGE_CAPACITY - 1);
        }
    }

    /// **Property:** a formatted line never exceeds its buffer and always
    /// ends with a newline.
    #[test]
    fn test_formatted_line_fits_buffer(
        message in ".{0,200}",
        buffer_len in 1usize..300,
    ) {
        let entry = LogEntry::new(Severity::Debug, Category::Game, &message);
        let mut buffer = vec![0u8; buffer_len];
        let line = format_log_message(&mut buffer, &entry);

        prop_assert!(line.len() <= buffer_len);
        prop_assert!(line.ends_with('\n'));
    }
}
