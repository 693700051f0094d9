use serde_derive::{Deserialize, Serialize};

/// Per-node role. Derived once from the ring index at bootstrap and
/// afterwards changed only through `Role::transition`.
#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Backup,
    Normal,
    Retiree,
}

/// The events that may change a role.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// A `push` arrived from the Primary.
    Pushed,
    /// The Backup detected that the Primary is unreachable.
    PrimaryCrashed,
    /// The retiring Primary called `set_primary`.
    HandedOff,
    /// The Primary is quitting voluntarily.
    Retired,
}

impl Role {
    pub fn from_index(index: usize) -> Self {
        match index {
        | 0 => Role::Primary,
        | 1 => Role::Backup,
        | _ => Role::Normal,
        }
    }

    /// Returns the role after `transition`, or `None` if the event is not
    /// legal in the current role.
    pub fn transition(self, transition: Transition) -> Option<Role> {
        match (self, transition) {
        | (Role::Normal, Transition::Pushed)
        | (Role::Backup, Transition::Pushed) => Some(Role::Backup),
        | (Role::Backup, Transition::PrimaryCrashed)
        | (Role::Backup, Transition::HandedOff) => Some(Role::Primary),
        | (Role::Primary, Transition::Retired) => Some(Role::Retiree),
        | _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
        | Role::Primary => "primary",
        | Role::Backup => "backup",
        | Role::Normal => "normal",
        | Role::Retiree => "retiree",
        };
        write!(fmt, "{}", name)
    }
}
