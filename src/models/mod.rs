mod article;
mod rule;

pub use article::{Article, Candidate, ListQuery, NewArticle, Page, MANUAL_SOURCE};
pub use rule::{NewRule, Rule, RuleScope, RuleType, ScrapeLogEntry};
