use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Account role. Stored as lowercase text in the `users` table and carried
/// verbatim inside token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Company,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Role, ApiError> {
        match s {
            "student" => Ok(Role::Student),
            "company" => Ok(Role::Company),
            "admin" => Ok(Role::Admin),
            other => Err(ApiError::Validation(format!("Invalid role: {}", other))),
        }
    }
}

/// Application lifecycle status. `Applied` is the entry state; companies may
/// only emit the two terminal decisions, admins may set any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Hired,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Hired => "Hired",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Message type recorded when a company attaches a note to a decision.
    /// Only the two terminal decisions produce messages.
    pub fn message_type(&self) -> Option<&'static str> {
        match self {
            ApplicationStatus::Hired => Some("hired"),
            ApplicationStatus::Rejected => Some("rejected"),
            _ => None,
        }
    }

    pub fn is_company_decision(&self) -> bool {
        matches!(self, ApplicationStatus::Hired | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<ApplicationStatus, ApiError> {
        match s {
            "Applied" => Ok(ApplicationStatus::Applied),
            "Shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "Hired" => Ok(ApplicationStatus::Hired),
            "Rejected" => Ok(ApplicationStatus::Rejected),
            "Withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(ApiError::Validation(format!("Invalid status: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Student, Role::Company, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_a_validation_error() {
        assert!(matches!("employer".parse::<Role>(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ApplicationStatus::Applied,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::Hired,
            ApplicationStatus::Rejected,
            ApplicationStatus::Withdrawn,
        ] {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_terminal_decisions_carry_a_message_type() {
        assert_eq!(ApplicationStatus::Hired.message_type(), Some("hired"));
        assert_eq!(ApplicationStatus::Rejected.message_type(), Some("rejected"));
        assert_eq!(ApplicationStatus::Applied.message_type(), None);
        assert_eq!(ApplicationStatus::Shortlisted.message_type(), None);
        assert_eq!(ApplicationStatus::Withdrawn.message_type(), None);
    }
}
