use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, unique within one portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ord-{}", self.0)
    }
}

/// Monotonic ID generator. Each portfolio owns one, so ids are reproducible
/// for a given sequence of submissions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_order_id(&mut self) -> OrderId {
        if self.next == 0 {
            self.next = 1;
        }
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential() {
        let mut ids = IdGen::new();
        assert_eq!(ids.next_order_id(), OrderId(1));
        assert_eq!(ids.next_order_id(), OrderId(2));
        assert_eq!(ids.next_order_id(), OrderId(3));
    }

    #[test]
    fn default_generator_starts_at_one() {
        let mut ids = IdGen::default();
        assert_eq!(ids.next_order_id(), OrderId(1));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(OrderId(42).to_string(), "ord-42");
    }
}
