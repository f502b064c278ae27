//! Order identifiers and monotonic ID generation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID assigned by the execution venue at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic order ID generator.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_gen_is_monotonic() {
        let mut gen = IdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        let c = gen.next_id();
        assert_eq!(a, OrderId(0));
        assert_eq!(b, OrderId(1));
        assert_eq!(c, OrderId(2));
    }

    #[test]
    fn order_id_display() {
        assert_eq!(OrderId(42).to_string(), "42");
    }
}
