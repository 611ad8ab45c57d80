use crate::models::{Rule, RuleScope, RuleType};

/// Tag assigned to candidates accepted through an allow-url rule.
pub const FEATURED_TAG: &str = "精选";

/// Canonical bank tag plus its accepted spellings. Aliases are matched
/// lowercased against the lowercased title.
const BANK_ALIASES: &[(&str, &[&str])] = &[
    ("农行", &["农行", "农业银行", "abc", "农"]),
    ("工行", &["工行", "工商银行", "icbc", "工"]),
    ("建行", &["建行", "建设银行", "ccb", "建"]),
    ("中行", &["中行", "中国银行", "boc", "中"]),
];

/// Non-bank keywords kept as the tag verbatim.
const GENERIC_KEYWORDS: &[&str] = &["立减金", "ljj", "红包", "水", "hang", "行"];

/// Listing noise excluded regardless of operator rules.
const DEFAULT_DENY_TITLE: &[&str] = &["排行榜", "排 行 榜", "榜单", "置顶"];

/// Known non-deal link patterns: third-party shortlink hosts and the
/// forum's plugin pages. Rejected even when a keyword matches.
const LINK_EXCLUSIONS: &[&str] = &["suo.yt", "sourl.cn", "plugin.php"];

/// The full rule set for one scrape pass: static defaults merged with
/// the operator rules read from the store at pass start.
pub struct RuleSet {
    deny_title: Vec<String>,
    deny_url: Vec<String>,
    allow_url: Vec<String>,
    /// (lowercased keyword, resolved tag), banks first so the most
    /// specific tag wins.
    allow_title: Vec<(String, String)>,
}

impl RuleSet {
    pub fn new(dynamic: &[Rule]) -> Self {
        let mut deny_title: Vec<String> = DEFAULT_DENY_TITLE
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        let mut deny_url = Vec::new();
        let mut allow_url = Vec::new();

        let mut allow_title: Vec<(String, String)> = Vec::new();
        for (canonical, aliases) in BANK_ALIASES {
            for alias in *aliases {
                allow_title.push((alias.to_lowercase(), canonical.to_string()));
            }
        }
        for keyword in GENERIC_KEYWORDS {
            allow_title.push((keyword.to_lowercase(), keyword.to_string()));
        }

        for rule in dynamic {
            match (rule.rule_type, rule.scope) {
                (RuleType::Deny, RuleScope::Title) => deny_title.push(rule.keyword.to_lowercase()),
                (RuleType::Deny, RuleScope::Url) => deny_url.push(rule.keyword.clone()),
                (RuleType::Allow, RuleScope::Url) => allow_url.push(rule.keyword.clone()),
                (RuleType::Allow, RuleScope::Title) => {
                    allow_title.push((rule.keyword.to_lowercase(), rule.keyword.clone()))
                }
            }
        }

        Self {
            deny_title,
            deny_url,
            allow_url,
            allow_title,
        }
    }

    /// Decide whether a candidate is kept and under which tag.
    /// Deny always wins over allow; allow-by-url bypasses title matching.
    pub fn classify(&self, title: &str, url: &str) -> Option<String> {
        let title_lower = title.to_lowercase();

        if self.deny_url.iter().any(|k| url.contains(k.as_str())) {
            return None;
        }
        if self
            .deny_title
            .iter()
            .any(|k| title_lower.contains(k.as_str()))
        {
            return None;
        }
        if LINK_EXCLUSIONS.iter().any(|k| url.contains(k)) {
            return None;
        }

        if self.allow_url.iter().any(|k| url.contains(k.as_str())) {
            return Some(FEATURED_TAG.to_string());
        }

        self.allow_title
            .iter()
            .find(|(keyword, _)| title_lower.contains(keyword.as_str()))
            .map(|(_, tag)| tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(rule_type: RuleType, scope: RuleScope, keyword: &str) -> Rule {
        Rule {
            id: 0,
            rule_type,
            scope,
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn bank_title_resolves_to_canonical_tag() {
        let rules = RuleSet::new(&[]);
        assert_eq!(
            rules.classify("农行水军来了", "https://x/view1.html"),
            Some("农行".to_string())
        );
    }

    #[test]
    fn all_aliases_of_one_bank_collapse() {
        let rules = RuleSet::new(&[]);
        for title in ["工行活动", "工商银行活动", "ICBC活动"] {
            assert_eq!(
                rules.classify(title, "https://x/view1.html"),
                Some("工行".to_string()),
                "title {:?}",
                title
            );
        }
    }

    #[test]
    fn unmatched_title_is_rejected() {
        let rules = RuleSet::new(&[]);
        assert_eq!(rules.classify("随便逛逛", "https://x/view1.html"), None);
    }

    #[test]
    fn deny_wins_over_allow() {
        let rules = RuleSet::new(&[rule(RuleType::Deny, RuleScope::Url, "loans")]);
        assert_eq!(
            rules.classify("农行立减金", "https://x/loans/offer1"),
            None
        );

        let rules = RuleSet::new(&[rule(RuleType::Deny, RuleScope::Title, "贷款")]);
        assert_eq!(rules.classify("农行贷款广告", "https://x/view1.html"), None);
    }

    #[test]
    fn deny_title_match_is_case_insensitive() {
        let rules = RuleSet::new(&[rule(RuleType::Deny, RuleScope::Title, "AD")]);
        assert_eq!(rules.classify("农行 ad 专区", "https://x/view1.html"), None);
    }

    #[test]
    fn allow_url_assigns_sentinel_and_bypasses_title() {
        let rules = RuleSet::new(&[rule(RuleType::Allow, RuleScope::Url, "special")]);
        assert_eq!(
            rules.classify("无关键词标题", "https://x/special/9"),
            Some(FEATURED_TAG.to_string())
        );
    }

    #[test]
    fn default_noise_titles_are_denied() {
        let rules = RuleSet::new(&[]);
        assert_eq!(rules.classify("农行排行榜", "https://x/view1.html"), None);
        assert_eq!(rules.classify("置顶 红包公告", "https://x/view1.html"), None);
    }

    #[test]
    fn shortlinks_and_plugin_paths_are_rejected() {
        let rules = RuleSet::new(&[]);
        assert_eq!(rules.classify("农行立减金", "https://suo.yt/abc"), None);
        assert_eq!(
            rules.classify("红包水贴", "https://x/plugin.php?id=sign"),
            None
        );
    }

    #[test]
    fn dynamic_allow_keyword_tags_verbatim() {
        let rules = RuleSet::new(&[rule(RuleType::Allow, RuleScope::Title, "话费")]);
        assert_eq!(
            rules.classify("充话费优惠", "https://x/view1.html"),
            Some("话费".to_string())
        );
    }

    #[test]
    fn generic_keyword_is_tag_verbatim() {
        let rules = RuleSet::new(&[]);
        assert_eq!(
            rules.classify("速领红包", "https://x/view1.html"),
            Some("红包".to_string())
        );
    }
}
