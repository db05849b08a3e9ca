use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::workflow::task::Task;
use crate::error::ConversionError;

/// Direction in which ready tasks are dispatched.
///
/// Changing it changes the dispatch order and therefore the simulated makespan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Descending,
    Ascending,
}

impl FromStr for SortDirection {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "descending" => Ok(SortDirection::Descending),
            "ascending" => Ok(SortDirection::Ascending),
            _ => Err(ConversionError::UnknownTaskOrdering(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Descending => write!(f, "descending"),
            SortDirection::Ascending => write!(f, "ascending"),
        }
    }
}

/// Imposes a deterministic total order on an unordered ready set.
///
/// Tasks are ordered by id; the arena key breaks ties between equal ids.
/// Both keys follow the configured direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadyTaskSelector {
    direction: SortDirection,
}

impl ReadyTaskSelector {
    pub fn new(direction: SortDirection) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn order(&self, mut ready_tasks: Vec<Task>) -> Vec<Task> {
        ready_tasks.sort_by(|a, b| self.compare(a, b));
        ready_tasks
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = a.id.cmp(&b.id).then_with(|| a.key.cmp(&b.key));

        match self.direction {
            SortDirection::Descending => ordering.reverse(),
            SortDirection::Ascending => ordering,
        }
    }
}
