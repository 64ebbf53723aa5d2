//! "Keep most recent" history trimming.
//!
//! Walks a thread from the newest message backwards, summing message sizes,
//! and keeps the longest recent run that fits the budget. The newest
//! message is always kept, so a non-empty history never trims to nothing.

use ellis_domain::config::SizeUnit;
use ellis_domain::Message;

/// Approximate chars-per-token multiplier for [`SizeUnit::ApproxTokens`].
const CHARS_PER_TOKEN: usize = 4;

/// Size of one message in `unit`s.
pub fn message_size(message: &Message, unit: SizeUnit) -> usize {
    match unit {
        SizeUnit::Messages => 1,
        SizeUnit::Chars => message.content.chars().count(),
        SizeUnit::ApproxTokens => {
            let chars = message.content.chars().count();
            chars.div_ceil(CHARS_PER_TOKEN).max(1)
        }
    }
}

/// Summary of a trim, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimReport {
    pub input: usize,
    pub kept: usize,
    /// Size of the kept window in `unit`s.
    pub size: usize,
    /// True when the newest message alone exceeded the budget.
    pub oversize: bool,
}

/// Trim `messages` to the most recent contiguous run whose total size is
/// within `budget`.
///
/// Surviving messages keep their order. If the newest message on its own
/// exceeds the budget it is still returned (alone).
pub fn trim(messages: &[Message], budget: usize, unit: SizeUnit) -> (Vec<Message>, TrimReport) {
    let mut used = 0usize;
    let mut start = messages.len();

    for (idx, message) in messages.iter().enumerate().rev() {
        let size = message_size(message, unit);
        let fits = used.saturating_add(size) <= budget;
        if !fits && start != messages.len() {
            break;
        }
        used = used.saturating_add(size);
        start = idx;
        if !fits {
            // Newest message alone is over budget; keep it and stop.
            break;
        }
    }

    let kept = messages[start..].to_vec();
    let report = TrimReport {
        input: messages.len(),
        kept: kept.len(),
        size: used,
        oversize: used > budget,
    };
    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(contents: &[&str]) -> Vec<Message> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i % 2 == 0 {
                    Message::user(*c)
                } else {
                    Message::assistant(*c)
                }
            })
            .collect()
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn empty_input_stays_empty() {
        let (kept, report) = trim(&[], 10, SizeUnit::Messages);
        assert!(kept.is_empty());
        assert_eq!(report.kept, 0);
        assert!(!report.oversize);
    }

    #[test]
    fn under_budget_keeps_everything() {
        let msgs = thread(&["a", "b", "c"]);
        let (kept, report) = trim(&msgs, 10, SizeUnit::Messages);
        assert_eq!(kept, msgs);
        assert_eq!(report.size, 3);
    }

    #[test]
    fn keeps_most_recent_messages() {
        let msgs = thread(&["a", "b", "c", "d", "e"]);
        let (kept, _) = trim(&msgs, 2, SizeUnit::Messages);
        assert_eq!(contents(&kept), vec!["d", "e"]);
    }

    #[test]
    fn char_budget_stops_at_first_overflow() {
        // sizes: 5, 1, 3 -> budget 4 keeps "ccc" + "b"; "aaaaa" would overflow.
        let msgs = thread(&["aaaaa", "b", "ccc"]);
        let (kept, report) = trim(&msgs, 4, SizeUnit::Chars);
        assert_eq!(contents(&kept), vec!["b", "ccc"]);
        assert_eq!(report.size, 4);
    }

    #[test]
    fn does_not_skip_over_a_large_message() {
        // A smaller, older message must not be pulled in past one that overflowed.
        let msgs = thread(&["a", "bbbbbbbbbb", "c"]);
        let (kept, _) = trim(&msgs, 5, SizeUnit::Chars);
        assert_eq!(contents(&kept), vec!["c"]);
    }

    #[test]
    fn oversize_newest_message_is_kept_alone() {
        let msgs = thread(&["short", "this one is far too long"]);
        let (kept, report) = trim(&msgs, 3, SizeUnit::Chars);
        assert_eq!(contents(&kept), vec!["this one is far too long"]);
        assert!(report.oversize);
    }

    #[test]
    fn zero_budget_keeps_newest() {
        let msgs = thread(&["a", "b"]);
        let (kept, _) = trim(&msgs, 0, SizeUnit::Messages);
        assert_eq!(contents(&kept), vec!["b"]);
    }

    #[test]
    fn approx_tokens_rounds_up() {
        assert_eq!(message_size(&Message::user(""), SizeUnit::ApproxTokens), 1);
        assert_eq!(message_size(&Message::user("abcd"), SizeUnit::ApproxTokens), 1);
        assert_eq!(message_size(&Message::user("abcde"), SizeUnit::ApproxTokens), 2);
    }

    #[test]
    fn chars_count_unicode_scalars() {
        assert_eq!(message_size(&Message::user("привет"), SizeUnit::Chars), 6);
    }

    #[test]
    fn trimming_is_idempotent() {
        let msgs = thread(&["one", "two", "three", "four", "five", "six"]);
        for unit in [SizeUnit::Messages, SizeUnit::Chars, SizeUnit::ApproxTokens] {
            for budget in 0..20 {
                let (once, _) = trim(&msgs, budget, unit);
                let (twice, _) = trim(&once, budget, unit);
                assert_eq!(once, twice, "unit={unit:?} budget={budget}");
            }
        }
    }

    #[test]
    fn larger_budget_never_keeps_fewer() {
        let msgs = thread(&["one", "two", "three", "four", "five", "six"]);
        for unit in [SizeUnit::Messages, SizeUnit::Chars, SizeUnit::ApproxTokens] {
            let mut prev = 0;
            for budget in 0..40 {
                let (kept, _) = trim(&msgs, budget, unit);
                assert!(kept.len() >= prev, "unit={unit:?} budget={budget}");
                prev = kept.len();
            }
        }
    }

    #[test]
    fn result_is_a_suffix_in_original_order() {
        let msgs = thread(&["one", "two", "three", "four", "five"]);
        for budget in 0..30 {
            let (kept, _) = trim(&msgs, budget, SizeUnit::Chars);
            assert!(!kept.is_empty());
            assert_eq!(&msgs[msgs.len() - kept.len()..], kept.as_slice());
        }
    }
}
