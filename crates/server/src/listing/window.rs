//! Result window guard.

use orderhub_core::PaginationWindow;

/// Check a listing window against the index deep-paging ceiling.
///
/// Returns `true` when `offset + size` exceeds the ceiling. The breach is a
/// diagnostic only: the request proceeds unchanged on both listing paths,
/// and the search path will surface whatever the index itself does with a
/// too-deep page.
pub fn check(window: PaginationWindow, ceiling: i64) -> bool {
    let breach = window.end() > ceiling;
    if breach {
        tracing::error!(
            offset = window.offset(),
            size = window.size(),
            ceiling,
            "listing window exceeds the index result ceiling"
        );
    }
    breach
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breach_is_flagged_but_not_fatal() {
        let window = PaginationWindow::new(49_950, 100).expect("valid window");
        assert!(check(window, 50_000));
    }

    #[test]
    fn window_at_the_ceiling_is_fine() {
        let window = PaginationWindow::new(49_900, 100).expect("valid window");
        assert!(!check(window, 50_000));
    }
}
