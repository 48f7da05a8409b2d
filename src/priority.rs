//! Ordering policy for strip targets and competing routes.

/// Sort by descending byte length. Equal lengths keep their order.
pub fn sort_by_size_desc<T: AsRef<str>>(values: &mut [T]) {
    values.sort_by(|a, b| b.as_ref().len().cmp(&a.as_ref().len()));
}

/// Priority a route is ordered by: the explicit priority when one is set,
/// otherwise the length of its rule, so longer (more specific) rules win.
pub fn effective_priority(rule: &str, explicit: Option<i64>) -> i64 {
    explicit.unwrap_or_else(|| i64::try_from(rule.len()).unwrap_or(i64::MAX))
}
