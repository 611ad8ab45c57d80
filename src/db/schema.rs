pub const SCHEMA: &str = r#"
-- articles table: one row per distinct URL
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    site_source TEXT NOT NULL,
    tag TEXT,
    original_time TEXT,
    is_top INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_tag ON articles(tag);
CREATE INDEX IF NOT EXISTS idx_articles_updated_at ON articles(updated_at);

-- cached article bodies, zero or one row per URL
CREATE TABLE IF NOT EXISTS article_content (
    url TEXT PRIMARY KEY,
    content TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- dynamic allow/deny keywords
CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_type TEXT NOT NULL CHECK (rule_type IN ('allow', 'deny')),
    scope TEXT NOT NULL CHECK (scope IN ('title', 'url')),
    keyword TEXT NOT NULL,
    UNIQUE(keyword, scope)
);

-- bounded ring of completed scrape passes
CREATE TABLE IF NOT EXISTS scrape_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    summary TEXT NOT NULL,
    detail TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
