use std::fmt::{Display, Formatter};

quantity!(Cost);

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Add two optional costs, treating a missing one as "not reported" rather than zero.
#[must_use]
pub fn add_optional(lhs: Option<Cost>, rhs: Option<Cost>) -> Option<Cost> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(lhs + rhs),
        (lhs, rhs) => lhs.or(rhs),
    }
}
