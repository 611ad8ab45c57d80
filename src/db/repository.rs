use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Article, ListQuery, NewArticle, NewRule, Page, Rule, RuleScope, RuleType, ScrapeLogEntry,
    MANUAL_SOURCE,
};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            // WAL + busy timeout so concurrent readers never block the
            // scrape writer.
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article ingestion

    /// Insert-or-ignore keyed by url. The returned count covers only
    /// genuinely new rows; re-scraped URLs are never updated.
    pub async fn insert_candidates(&self, articles: Vec<NewArticle>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let mut inserted = 0;
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR IGNORE INTO articles
                           (title, url, site_source, tag, original_time, updated_at)
                           VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))"#,
                    )?;
                    for article in &articles {
                        inserted += stmt.execute(params![
                            article.title,
                            article.url,
                            article.site_source,
                            article.tag,
                            article.original_time,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    /// Operator-published entry. A synthetic manual:// URL keeps the
    /// url-uniqueness invariant; the body goes straight to the cache table.
    pub async fn publish_manual(
        &self,
        title: String,
        content: String,
        tag: String,
        pinned: bool,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let url = format!("manual://{}", Utc::now().timestamp_micros());
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO articles
                       (title, url, site_source, tag, original_time, is_top, updated_at)
                       VALUES (?1, ?2, ?3, ?4, strftime('%H:%M', 'now'), ?5, datetime('now'))"#,
                    params![title, url, MANUAL_SOURCE, tag, pinned as i64],
                )?;
                let id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT OR REPLACE INTO article_content (url, content, updated_at) VALUES (?1, ?2, datetime('now'))",
                    params![url, content],
                )?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn set_pinned(&self, id: i64, pinned: bool) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET is_top = ?1 WHERE id = ?2",
                    params![pinned as i64, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Read side

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, url, site_source, tag, original_time, is_top, updated_at
                     FROM articles WHERE id = ?1",
                )?;
                let article = stmt
                    .query_row(params![id], |row| Ok(article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn list_articles(&self, query: ListQuery) -> Result<Page<Article>> {
        let per_page = query.per_page.max(1);
        let offset = query.offset();
        let page = self
            .conn
            .call(move |conn| {
                let mut clauses: Vec<&str> = Vec::new();
                let mut binds: Vec<String> = Vec::new();
                if let Some(tag) = &query.tag {
                    clauses.push("tag = ?");
                    binds.push(tag.clone());
                }
                if let Some(needle) = &query.search {
                    clauses.push("title LIKE ?");
                    binds.push(format!("%{}%", needle));
                }
                let where_clause = if clauses.is_empty() {
                    String::new()
                } else {
                    format!("WHERE {}", clauses.join(" AND "))
                };

                let total_count: u32 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM articles {}", where_clause),
                    params_from_iter(binds.iter()),
                    |row| row.get(0),
                )?;

                let mut stmt = conn.prepare(&format!(
                    "SELECT id, title, url, site_source, tag, original_time, is_top, updated_at
                     FROM articles {}
                     ORDER BY is_top DESC, id DESC
                     LIMIT {} OFFSET {}",
                    where_clause, per_page, offset
                ))?;
                let items = stmt
                    .query_map(params_from_iter(binds.iter()), |row| {
                        Ok(article_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let total_pages = if total_count == 0 {
                    1
                } else {
                    total_count.div_ceil(per_page)
                };
                Ok(Page {
                    items,
                    total_count,
                    total_pages,
                    page: query.page.max(1),
                })
            })
            .await?;
        Ok(page)
    }

    pub async fn article_count(&self) -> Result<u32> {
        let count = self
            .conn
            .call(|conn| {
                let count: u32 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Content cache

    pub async fn get_cached_content(&self, url: &str) -> Result<Option<String>> {
        let url = url.to_string();
        let content = self
            .conn
            .call(move |conn| {
                let content: Option<String> = conn
                    .query_row(
                        "SELECT content FROM article_content WHERE url = ?1",
                        params![url],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(content)
            })
            .await?;
        Ok(content)
    }

    pub async fn put_content(&self, url: &str, content: &str) -> Result<()> {
        let url = url.to_string();
        let content = content.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO article_content (url, content, updated_at)
                     VALUES (?1, ?2, datetime('now'))",
                    params![url, content],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Rules

    /// Returns false when (keyword, scope) already exists.
    pub async fn insert_rule(&self, rule: NewRule) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO rules (rule_type, scope, keyword) VALUES (?1, ?2, ?3)",
                    params![rule.rule_type.as_str(), rule.scope.as_str(), rule.keyword],
                )?;
                Ok(n > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM rules WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_rules(&self) -> Result<Vec<Rule>> {
        let rules = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, rule_type, scope, keyword FROM rules ORDER BY id")?;
                let rules = stmt
                    .query_map([], |row| Ok(rule_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rules.into_iter().flatten().collect())
            })
            .await?;
        Ok(rules)
    }

    // Scrape log ring

    pub async fn append_scrape_log(&self, summary: String, detail: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO scrape_log (summary, detail) VALUES (?1, ?2)",
                    params![summary, detail],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn recent_scrape_log(&self, limit: u32) -> Result<Vec<ScrapeLogEntry>> {
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, summary, detail, created_at FROM scrape_log
                     ORDER BY id DESC LIMIT ?1",
                )?;
                let entries = stmt
                    .query_map(params![limit], |row| Ok(log_entry_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await?;
        Ok(entries)
    }

    pub async fn trim_scrape_log(&self, keep: u32) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM scrape_log WHERE id NOT IN
                     (SELECT id FROM scrape_log ORDER BY id DESC LIMIT ?1)",
                    params![keep],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Retention

    /// Delete non-manual articles past the retention window, then content
    /// rows left without an article. Manual entries are exempt.
    pub async fn prune_articles(&self, retention_days: u32) -> Result<usize> {
        let deleted = self
            .conn
            .call(move |conn| {
                let window = format!("-{} days", retention_days);
                let tx = conn.transaction()?;
                let deleted = tx.execute(
                    "DELETE FROM articles
                     WHERE site_source != ?1 AND updated_at < datetime('now', ?2)",
                    params![MANUAL_SOURCE, window],
                )?;
                tx.execute(
                    "DELETE FROM article_content
                     WHERE url NOT IN (SELECT url FROM articles)",
                    [],
                )?;
                tx.commit()?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 first, then SQLite's default "YYYY-MM-DD HH:MM:SS".
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        url: row.get(2).unwrap(),
        site_source: row.get(3).unwrap(),
        tag: row.get(4).unwrap(),
        original_time: row.get(5).unwrap(),
        is_top: row.get::<_, i64>(6).unwrap() != 0,
        updated_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

fn rule_from_row(row: &Row) -> Option<Rule> {
    let rule_type = RuleType::parse(&row.get::<_, String>(1).unwrap())?;
    let scope = RuleScope::parse(&row.get::<_, String>(2).unwrap())?;
    Some(Rule {
        id: row.get(0).unwrap(),
        rule_type,
        scope,
        keyword: row.get(3).unwrap(),
    })
}

fn log_entry_from_row(row: &Row) -> ScrapeLogEntry {
    ScrapeLogEntry {
        id: row.get(0).unwrap(),
        summary: row.get(1).unwrap(),
        detail: row.get::<_, Option<String>>(2).unwrap().unwrap_or_default(),
        created_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
