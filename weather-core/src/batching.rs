//! Splitting a city list into upstream requests and per-minute windows.

/// Split `items` into consecutive batches of at most `max_per_batch`,
/// preserving order. A cap of zero is treated as one.
pub fn partition<T: Clone>(items: &[T], max_per_batch: usize) -> Vec<Vec<T>> {
    items
        .chunks(max_per_batch.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

/// Group consecutive batches into windows of at most `max_per_window`.
pub fn windows<T>(batches: &[T], max_per_window: usize) -> std::slice::Chunks<'_, T> {
    batches.chunks(max_per_window.max(1))
}

/// Number of windows `windows` yields for `batch_count` batches.
pub fn window_count(batch_count: usize, max_per_window: usize) -> usize {
    batch_count.div_ceil(max_per_window.max(1))
}
