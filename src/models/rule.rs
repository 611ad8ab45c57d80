use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Allow,
    Deny,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allow => "allow",
            RuleType::Deny => "deny",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(RuleType::Allow),
            "deny" => Some(RuleType::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    Title,
    Url,
}

impl RuleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Title => "title",
            RuleScope::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(RuleScope::Title),
            "url" => Some(RuleScope::Url),
            _ => None,
        }
    }
}

/// Operator-managed allow/deny keyword. (keyword, scope) is unique;
/// duplicate inserts are silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub rule_type: RuleType,
    pub scope: RuleScope,
    pub keyword: String,
}

#[derive(Debug, Clone)]
pub struct NewRule {
    pub rule_type: RuleType,
    pub scope: RuleScope,
    pub keyword: String,
}

/// One completed scrape pass: a human summary line plus a JSON map of
/// per-site new-row counts. The table is trimmed to a bounded ring.
#[derive(Debug, Clone)]
pub struct ScrapeLogEntry {
    pub id: i64,
    pub summary: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}
