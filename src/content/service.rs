use scraper::{Html, Selector};

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::Article;
use crate::scrape::PageFetcher;

use super::sanitizer::sanitize;

/// A cached body shorter than this is treated as absent and refetched.
pub const MIN_CONTENT_LEN: usize = 80;

/// Fetches article bodies on first view and serves the cache afterwards.
/// `get_body` never fails the page render; fetch and parse problems come
/// back as inline messages.
pub struct ContentService {
    fetcher: PageFetcher,
}

impl ContentService {
    pub fn new() -> Self {
        Self {
            fetcher: PageFetcher::new(),
        }
    }

    pub async fn get_body(
        &self,
        repository: &Repository,
        article: &Article,
        config: &Config,
    ) -> String {
        // Operator-authored bodies are stored verbatim and trusted.
        if article.is_manual() {
            return match repository.get_cached_content(&article.url).await {
                Ok(Some(content)) => content,
                _ => missing_box(),
            };
        }

        let site = config.site(&article.site_source);
        let domain = site.map(|s| s.domain.as_str()).unwrap_or("");
        let proxy = &config.image_proxy_path;

        if let Ok(Some(cached)) = repository.get_cached_content(&article.url).await {
            if cached.len() >= MIN_CONTENT_LEN {
                return sanitize(&cached, domain, proxy);
            }
        }

        let Some(site) = site else {
            tracing::warn!("article {} references unknown site {}", article.id, article.site_source);
            return fallback_box(&article.url);
        };

        match self.fetch_body(article, site.content_selectors.as_slice(), &site.domain).await {
            Ok(Some(raw)) => {
                if let Err(e) = repository.put_content(&article.url, &raw).await {
                    tracing::warn!("failed to cache content for {}: {}", article.url, e);
                }
                sanitize(&raw, domain, proxy)
            }
            Ok(None) => fallback_box(&article.url),
            Err(e) => {
                tracing::warn!("content fetch failed for {}: {}", article.url, e);
                error_box(&article.url)
            }
        }
    }

    /// Try each configured body selector in order; first match with
    /// enough visible text wins. Returns the raw element HTML.
    async fn fetch_body(
        &self,
        article: &Article,
        selectors: &[String],
        domain: &str,
    ) -> Result<Option<String>> {
        let html = self.fetcher.get(&article.url, Some(domain)).await?;

        let document = Html::parse_document(&html);
        for selector_str in selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            if let Some(element) = document.select(&selector).next() {
                let text_len: usize = element.text().map(|t| t.trim().chars().count()).sum();
                if text_len >= MIN_CONTENT_LEN {
                    return Ok(Some(element.html()));
                }
            }
        }
        Ok(None)
    }
}

impl Default for ContentService {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_box(url: &str) -> String {
    format!(
        r#"<div class="alert alert-warning">无法自动提取正文，请查看 <a href="{}" target="_blank" rel="noopener noreferrer">原网页</a>。</div>"#,
        url
    )
}

fn error_box(url: &str) -> String {
    format!(
        r#"<div class="alert alert-danger">内容获取失败，请稍后重试或查看 <a href="{}" target="_blank" rel="noopener noreferrer">原网页</a>。</div>"#,
        url
    )
}

fn missing_box() -> String {
    r#"<div class="alert alert-danger">文章不存在或已被清理</div>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::models::{ListQuery, NewArticle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn serve_html(html: String) -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                hits_clone.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    html.len(),
                    html
                );
                let _ = sock.write_all(response.as_bytes()).await;
            }
        });
        (format!("http://{}", addr), hits)
    }

    async fn test_repo() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        (Repository::new(path.to_str().unwrap()).await.unwrap(), dir)
    }

    fn config_with_site(base: &str) -> Config {
        Config {
            sites: vec![SiteConfig {
                name: "test".to_string(),
                domain: base.to_string(),
                list_url: format!("{}/", base),
                row_selector: "tr, li".to_string(),
                content_selectors: vec!["td.t_f".to_string(), "div.message".to_string()],
            }],
            ..Config::default()
        }
    }

    async fn insert_article(repo: &Repository, url: &str) -> Article {
        repo.insert_candidates(vec![NewArticle {
            title: "农行立减金".to_string(),
            url: url.to_string(),
            site_source: "test".to_string(),
            tag: "农行".to_string(),
            original_time: "12:30".to_string(),
        }])
        .await
        .unwrap();
        let page = repo.list_articles(ListQuery::page(1, 10)).await.unwrap();
        page.items.into_iter().find(|a| a.url == url).unwrap()
    }

    fn long_body() -> String {
        "活动正文".repeat(40)
    }

    #[tokio::test]
    async fn first_view_fetches_once_then_serves_cache() {
        let page = format!(
            r#"<html><body><div class="message">{}</div></body></html>"#,
            long_body()
        );
        let (base, hits) = serve_html(page).await;
        let (repo, _dir) = test_repo().await;
        let config = config_with_site(&base);
        let article = insert_article(&repo, &format!("{}/view1.html", base)).await;
        let service = ContentService::new();

        let first = service.get_body(&repo, &article, &config).await;
        assert!(first.contains(&long_body()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(repo
            .get_cached_content(&article.url)
            .await
            .unwrap()
            .is_some());

        let second = service.get_body(&repo, &article, &config).await;
        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_cached_body_triggers_refetch() {
        let page = format!(
            r#"<html><body><table><tr><td class="t_f">{}</td></tr></table></body></html>"#,
            long_body()
        );
        let (base, hits) = serve_html(page).await;
        let (repo, _dir) = test_repo().await;
        let config = config_with_site(&base);
        let article = insert_article(&repo, &format!("{}/view1.html", base)).await;
        repo.put_content(&article.url, "太短").await.unwrap();

        let body = ContentService::new().get_body(&repo, &article, &config).await;
        assert!(body.contains(&long_body()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_body_is_sanitized_on_the_way_out() {
        let (repo, _dir) = test_repo().await;
        let config = config_with_site("https://forum.example");
        let article = insert_article(&repo, "https://forum.example/view1.html").await;
        let raw = format!(
            r#"<div class="message" onclick="x()">{}<img src="/p.jpg" width="9"></div>"#,
            long_body()
        );
        repo.put_content(&article.url, &raw).await.unwrap();

        let body = ContentService::new().get_body(&repo, &article, &config).await;
        assert!(!body.contains("onclick"));
        assert!(body.contains(r#"src="/img_proxy?url=https%3A%2F%2Fforum.example%2Fp.jpg""#));
    }

    #[tokio::test]
    async fn no_matching_selector_yields_fallback_not_error() {
        let page = r#"<html><body><div id="nav">菜单</div></body></html>"#.to_string();
        let (base, _hits) = serve_html(page).await;
        let (repo, _dir) = test_repo().await;
        let config = config_with_site(&base);
        let article = insert_article(&repo, &format!("{}/view1.html", base)).await;

        let body = ContentService::new().get_body(&repo, &article, &config).await;
        assert!(body.contains("无法自动提取正文"));
        assert!(body.contains(&article.url));
        // Failed extraction is not cached.
        assert!(repo
            .get_cached_content(&article.url)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn network_failure_yields_inline_error() {
        let (repo, _dir) = test_repo().await;
        let config = config_with_site("http://127.0.0.1:1");
        let article = insert_article(&repo, "http://127.0.0.1:1/view1.html").await;

        let body = ContentService::new().get_body(&repo, &article, &config).await;
        assert!(body.contains("内容获取失败"));
    }

    #[tokio::test]
    async fn manual_article_body_is_served_verbatim() {
        let (repo, _dir) = test_repo().await;
        let config = config_with_site("https://forum.example");
        let id = repo
            .publish_manual(
                "公告".to_string(),
                "<p onclick=\"keep\">手动正文</p>".to_string(),
                "公告".to_string(),
                false,
            )
            .await
            .unwrap();
        let article = repo.get_article(id).await.unwrap().unwrap();

        let body = ContentService::new().get_body(&repo, &article, &config).await;
        assert_eq!(body, "<p onclick=\"keep\">手动正文</p>");
    }
}
