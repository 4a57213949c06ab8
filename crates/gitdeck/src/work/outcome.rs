/// Result of one attempt of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<E> {
    /// Done; the task ends.
    Success,
    /// Worth another attempt after a delay.
    Transient(E),
    /// Not worth retrying; the task ends.
    Permanent(E),
}

impl<E> CallOutcome<E> {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The error carried by a failed attempt.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Success => None,
            Self::Transient(e) | Self::Permanent(e) => Some(e),
        }
    }
}
