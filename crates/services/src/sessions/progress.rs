/// Aggregated view of run progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// 1-based position of the current question; equals `total` once complete.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub is_complete: bool,
}
