// View filtering for tasks

use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Predicate restricting which tasks are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl Filter {
    /// Every filter, in menu order
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Completed, Filter::Incomplete];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed,
            Filter::Incomplete => !task.completed,
        }
    }

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Completed => "Completed",
            Filter::Incomplete => "Incomplete",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Completed => write!(f, "completed"),
            Filter::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "completed" | "done" => Ok(Filter::Completed),
            "incomplete" | "todo" => Ok(Filter::Incomplete),
            other => Err(format!(
                "unknown filter: {} (expected all, completed or incomplete)",
                other
            )),
        }
    }
}
