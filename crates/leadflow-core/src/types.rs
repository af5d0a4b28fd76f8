//! Domain records shared by the store, the HTTP API and the campaign engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LeadflowError;

/// Pipeline stage of a lead (one kanban column each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeadStatus {
    #[default]
    #[serde(rename = "lista_leads")]
    Backlog,
    #[serde(rename = "primeiro_contato")]
    FirstContact,
    #[serde(rename = "follow_up")]
    FollowUp,
    #[serde(rename = "interessados")]
    Interested,
    #[serde(rename = "reuniao_agendada")]
    MeetingScheduled,
    #[serde(rename = "fechados")]
    Closed,
    #[serde(rename = "perdidos")]
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 7] = [
        LeadStatus::Backlog,
        LeadStatus::FirstContact,
        LeadStatus::FollowUp,
        LeadStatus::Interested,
        LeadStatus::MeetingScheduled,
        LeadStatus::Closed,
        LeadStatus::Lost,
    ];

    /// Wire/database value.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Backlog => "lista_leads",
            LeadStatus::FirstContact => "primeiro_contato",
            LeadStatus::FollowUp => "follow_up",
            LeadStatus::Interested => "interessados",
            LeadStatus::MeetingScheduled => "reuniao_agendada",
            LeadStatus::Closed => "fechados",
            LeadStatus::Lost => "perdidos",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = LeadflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| LeadflowError::Validation(format!("unknown lead status '{s}'")))
    }
}

/// Temperature tag on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeadTag {
    #[serde(rename = "quente")]
    Hot,
    #[default]
    #[serde(rename = "morno")]
    Warm,
    #[serde(rename = "frio")]
    Cold,
}

impl LeadTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTag::Hot => "quente",
            LeadTag::Warm => "morno",
            LeadTag::Cold => "frio",
        }
    }
}

impl fmt::Display for LeadTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadTag {
    type Err = LeadflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quente" => Ok(LeadTag::Hot),
            "morno" => Ok(LeadTag::Warm),
            "frio" => Ok(LeadTag::Cold),
            other => Err(LeadflowError::Validation(format!("unknown lead tag '{other}'"))),
        }
    }
}

/// A sales lead as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    /// Free-text niche/segment, used by campaign filters.
    pub category: Option<String>,
    /// Raw contact handle (usually a phone number as typed by the seller).
    pub contact: Option<String>,
    pub first_contact_date: Option<String>,
    pub notes: Option<String>,
    pub status: LeadStatus,
    pub tag: LeadTag,
    pub meeting_date: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub first_contact_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub tag: LeadTag,
    #[serde(default)]
    pub meeting_date: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// Partial update of a lead. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub first_contact_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub tag: Option<LeadTag>,
    /// An empty string clears the meeting.
    #[serde(default)]
    pub meeting_date: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.contact.is_none()
            && self.first_contact_date.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.tag.is_none()
            && self.meeting_date.is_none()
            && self.user_id.is_none()
    }

    /// True when the patch only moves the lead to another column.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && LeadPatch {
                status: None,
                ..self.clone()
            }
            .is_empty()
    }
}

/// A seller account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub daily_goal: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_daily_goal")]
    pub daily_goal: i64,
}

fn default_role() -> String { "vendedor".into() }
fn default_daily_goal() -> i64 { 5 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub daily_goal: Option<i64>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Leads created by one seller on one day, against their daily goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub user_id: i64,
    pub user_name: String,
    pub date: String,
    pub leads_created: i64,
    pub daily_goal: i64,
    pub percentage: f64,
}

/// One addressable lead, as the campaign engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub display_name: String,
    pub contact_handle: String,
    pub category: Option<String>,
}

impl From<&Lead> for Recipient {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            display_name: lead.name.clone(),
            contact_handle: lead.contact.clone().unwrap_or_default(),
            category: lead.category.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::FirstContact).unwrap(),
            "\"primeiro_contato\""
        );
        let st: LeadStatus = serde_json::from_str("\"reuniao_agendada\"").unwrap();
        assert_eq!(st, LeadStatus::MeetingScheduled);
        for st in LeadStatus::ALL {
            assert_eq!(st.as_str().parse::<LeadStatus>().unwrap(), st);
        }
        assert!("done".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_tag_defaults_to_warm() {
        assert_eq!(LeadTag::default(), LeadTag::Warm);
        assert_eq!("frio".parse::<LeadTag>().unwrap(), LeadTag::Cold);
    }

    #[test]
    fn test_patch_status_only() {
        let patch: LeadPatch = serde_json::from_str(r#"{"status":"follow_up"}"#).unwrap();
        assert!(patch.is_status_only());
        let patch: LeadPatch =
            serde_json::from_str(r#"{"status":"follow_up","notes":"called"}"#).unwrap();
        assert!(!patch.is_status_only());
        assert!(LeadPatch::default().is_empty());
    }

    #[test]
    fn test_recipient_from_lead() {
        let lead = Lead {
            id: 4,
            name: "Clínica Sorriso".into(),
            category: Some("Clínica".into()),
            contact: None,
            first_contact_date: None,
            notes: None,
            status: LeadStatus::Backlog,
            tag: LeadTag::Hot,
            meeting_date: None,
            user_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let r = Recipient::from(&lead);
        assert_eq!(r.id, 4);
        assert_eq!(r.display_name, "Clínica Sorriso");
        assert_eq!(r.contact_handle, "");
        assert_eq!(r.category.as_deref(), Some("Clínica"));
    }
}
