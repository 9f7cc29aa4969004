//! The four named lanes and their strict dequeue priority (§4.F).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    HighPriority,
    Default,
    LowPriority,
    Maintenance,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::HighPriority => "high_priority",
            Lane::Default => "default",
            Lane::LowPriority => "low_priority",
            Lane::Maintenance => "maintenance",
        }
    }

    /// One rung down, used to demote a job on job-level retry (§4.G).
    pub fn demoted(&self) -> Lane {
        match self {
            Lane::HighPriority => Lane::Default,
            Lane::Default => Lane::LowPriority,
            Lane::LowPriority | Lane::Maintenance => Lane::LowPriority,
        }
    }

    /// Dequeue order: high → default → low → maintenance.
    pub const ALL_IN_PRIORITY_ORDER: [Lane; 4] =
        [Lane::HighPriority, Lane::Default, Lane::LowPriority, Lane::Maintenance];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high_priority" => Some(Lane::HighPriority),
            "default" => Some(Lane::Default),
            "low_priority" => Some(Lane::LowPriority),
            "maintenance" => Some(Lane::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_high_to_maintenance() {
        let names: Vec<_> = Lane::ALL_IN_PRIORITY_ORDER.iter().map(Lane::as_str).collect();
        assert_eq!(names, ["high_priority", "default", "low_priority", "maintenance"]);
    }

    #[test]
    fn demotion_never_escalates() {
        assert_eq!(Lane::HighPriority.demoted(), Lane::Default);
        assert_eq!(Lane::Default.demoted(), Lane::LowPriority);
        assert_eq!(Lane::LowPriority.demoted(), Lane::LowPriority);
    }
}
