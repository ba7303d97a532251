use crate::types::Dated;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range shared by two collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Both collections after truncation to their common window
#[derive(Debug, Clone)]
pub struct WindowedCollections<A, B> {
    pub first: Vec<A>,
    pub second: Vec<B>,
    /// `None` when the inputs do not overlap (both collections are then empty)
    pub window: Option<DateWindow>,
}

fn date_range<T: Dated>(records: &[T]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().map(Dated::date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Compute the window both collections cover, if any
pub fn common_window<A: Dated, B: Dated>(first: &[A], second: &[B]) -> Option<DateWindow> {
    let (a_min, a_max) = date_range(first)?;
    let (b_min, b_max) = date_range(second)?;

    let window = DateWindow {
        start: a_min.max(b_min),
        end: a_max.min(b_max),
    };

    (window.start <= window.end).then_some(window)
}

/// Truncate both collections to the dates they have in common.
///
/// Disjoint or empty inputs are not an error: both outputs come back empty
/// and the condition is logged.
pub fn reduce_to_common_window<A: Dated, B: Dated>(
    first: Vec<A>,
    second: Vec<B>,
) -> WindowedCollections<A, B> {
    let (first_len, second_len) = (first.len(), second.len());

    let Some(window) = common_window(&first, &second) else {
        log::warn!(
            "No temporal overlap between collections ({} and {} records), both reduced to empty",
            first_len,
            second_len
        );
        return WindowedCollections {
            first: Vec::new(),
            second: Vec::new(),
            window: None,
        };
    };

    log::info!("Common observation window: {} to {}", window.start, window.end);

    let first: Vec<A> = first.into_iter().filter(|r| window.contains(r.date())).collect();
    let second: Vec<B> = second.into_iter().filter(|r| window.contains(r.date())).collect();

    log::debug!(
        "Window reduction kept {}/{} and {}/{} records",
        first.len(),
        first_len,
        second.len(),
        second_len
    );

    WindowedCollections {
        first,
        second,
        window: Some(window),
    }
}
