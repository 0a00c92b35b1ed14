use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Requester,
    TechnicalReviewer,
    ExecutionTechnician,
    Administrator,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::TechnicalReviewer => "technical_reviewer",
            Self::ExecutionTechnician => "execution_technician",
            Self::Administrator => "administrator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "requester" => Some(Self::Requester),
            "technical_reviewer" | "reviewer" => Some(Self::TechnicalReviewer),
            "execution_technician" | "technician" => Some(Self::ExecutionTechnician),
            "administrator" | "admin" => Some(Self::Administrator),
            _ => None,
        }
    }
}

/// The authenticated party issuing a command. Identity is always passed in
/// explicitly; the workflow never falls back to an ambient "current user".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: ActorRole) -> Self {
        Self { id: id.into(), display_name: display_name.into(), role }
    }

    /// Name recorded on evaluations and execution records.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}
