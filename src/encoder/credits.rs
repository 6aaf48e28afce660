//! # Start/end credits scheduling
//!
//! Resolves a [`crate::config::CreditsWindow`] plus its text into a
//! concrete `(start_ms, end_ms)` pair, centred in the admissible window
//! when both a `not_before`/`not_after` bound and a `for_at_least`/
//! `for_at_most` duration are given.
//!
//! Grounded on `original_source/src/lib_ccx/ccx_encoders_helpers.c`'s
//! `find_start_of_captions`/credits handling.

use crate::config::CreditsWindow;

/// Computes where a credit screen should sit.
///
/// `reference_ms` is the first caption's start time for a start credit,
/// or the last caption's end time for an end credit; the window's
/// `not_before`/`not_after` bounds are relative to stream start in both
/// cases (matching the design's `CreditsWindow` doc comment).
///
/// Returns `None` if the window can't be satisfied (e.g. `not_after` is
/// already in the past relative to `reference_ms`).
pub fn schedule(window: &CreditsWindow, reference_ms: i64) -> Option<(i64, i64)> {
    let not_before = window.not_before_ms.unwrap_or(0);
    let not_after = window.not_after_ms.unwrap_or(reference_ms.max(not_before));
    if not_after < not_before {
        return None;
    }

    let duration = window
        .for_at_least_ms
        .unwrap_or(2000)
        .max(1)
        .min(window.for_at_most_ms.unwrap_or(i64::MAX).max(1));

    let admissible_span = (not_after - not_before).max(0);
    let start = if admissible_span >= duration {
        not_before + (admissible_span - duration) / 2
    } else {
        not_before
    };
    Some((start, start + duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centres_within_an_admissible_window() {
        let w = CreditsWindow {
            not_before_ms: Some(0),
            not_after_ms: Some(10_000),
            for_at_least_ms: Some(2000),
            for_at_most_ms: Some(2000),
        };
        let (start, end) = schedule(&w, 30_000).unwrap();
        assert_eq!(start, 4000);
        assert_eq!(end, 6000);
    }

    #[test]
    fn unset_window_defaults_to_a_two_second_credit_at_reference() {
        let w = CreditsWindow::default();
        let (start, end) = schedule(&w, 1000).unwrap();
        assert_eq!(start, 0);
        assert_eq!(end, 2000);
    }

    #[test]
    fn contradictory_bounds_yield_none() {
        let w = CreditsWindow {
            not_before_ms: Some(5000),
            not_after_ms: Some(1000),
            ..Default::default()
        };
        assert!(schedule(&w, 10_000).is_none());
    }
}
