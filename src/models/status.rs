use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Position of an application in the hiring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Applied,
    Invited,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Invited,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Invited => "INVITED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Hired => "HIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Rejected | ApplicationStatus::Hired)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPLIED" => Ok(ApplicationStatus::Applied),
            "INVITED" => Ok(ApplicationStatus::Invited),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "HIRED" => Ok(ApplicationStatus::Hired),
            other => Err(format!("Unknown application status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("invited".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Invited));
        assert_eq!(" Hired ".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Hired));
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        let json = serde_json::to_string(&ApplicationStatus::Rejected).unwrap();
        assert_eq!(json, "\"REJECTED\"");
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
    }
}
