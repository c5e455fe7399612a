use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ParseError;
use crate::models::{RawComment, Thread};

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr.athing").unwrap());
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.titleline > a").unwrap());
static LEGACY_TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.titlelink").unwrap());
static MORE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.morelink").unwrap());
static COMMENT_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr.athing.comtr").unwrap());
static INDENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.ind").unwrap());
static SPACER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static USER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.hnuser").unwrap());
static COMMENT_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.commtext").unwrap());
static PERMALINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.age a").unwrap());

static HIRING_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Ask HN: Who is hiring\? \((?P<month>\w+) (?P<year>\d{4})\)").unwrap()
});

pub struct ThreadListPage {
    pub threads: Vec<Thread>,
    /// Relative href of the next list page, if any.
    pub next: Option<String>,
}

pub struct CommentPage {
    pub comments: Vec<RawComment>,
    pub has_more: bool,
}

/// Turns fetched markup into threads and comments.
pub trait PageParser {
    fn parse_thread_list(&self, html: &str) -> Result<ThreadListPage, ParseError>;
    fn parse_comments(&self, html: &str, thread_date: NaiveDate)
        -> Result<CommentPage, ParseError>;
}

/// Hacker News markup.
pub struct HnParser {
    base_url: String,
}

impl HnParser {
    pub fn new(base_url: &str) -> Self {
        HnParser {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn absolute(&self, href: &str) -> String {
        format!("{}/{}", self.base_url, href.trim_start_matches('/'))
    }
}

impl PageParser for HnParser {
    fn parse_thread_list(&self, html: &str) -> Result<ThreadListPage, ParseError> {
        let doc = Html::parse_document(html);
        let rows: Vec<ElementRef> = doc.select(&ROW).collect();
        if rows.is_empty() {
            return Err(ParseError::MissingStructure("tr.athing"));
        }

        let threads = rows
            .into_iter()
            .filter_map(|row| {
                let link = row
                    .select(&TITLE_LINK)
                    .next()
                    .or_else(|| row.select(&LEGACY_TITLE_LINK).next())?;
                let title = link.text().collect::<String>();
                let caps = HIRING_TITLE_RE.captures(&title)?;
                let thread_date = parse_month(&caps["month"], &caps["year"])?;
                let id = row.value().attr("id")?.to_string();
                Some(Thread {
                    url: self.absolute(&format!("item?id={}", id)),
                    id,
                    title,
                    thread_date,
                })
            })
            .collect();

        let next = doc
            .select(&MORE_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        Ok(ThreadListPage { threads, next })
    }

    fn parse_comments(
        &self,
        html: &str,
        thread_date: NaiveDate,
    ) -> Result<CommentPage, ParseError> {
        let doc = Html::parse_document(html);
        if doc.select(&ROW).next().is_none() {
            return Err(ParseError::MissingStructure("tr.athing"));
        }

        let comments = doc
            .select(&COMMENT_ROW)
            .filter(is_top_level)
            .filter_map(|row| {
                let id = row.value().attr("id")?.to_string();
                let user = row
                    .select(&USER)
                    .next()
                    .map(|u| u.text().collect::<String>())
                    .unwrap_or_else(|| "unknown".to_string());
                let raw_text = row
                    .select(&COMMENT_TEXT)
                    .next()
                    .map(|t| t.text().collect::<Vec<_>>().join("\n").trim().to_string())
                    .unwrap_or_default();
                let url = row
                    .select(&PERMALINK)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| self.absolute(href))
                    .unwrap_or_default();
                Some(RawComment {
                    id,
                    thread_date,
                    raw_text,
                    user,
                    url,
                })
            })
            .collect();

        let has_more = doc.select(&MORE_LINK).next().is_some();
        Ok(CommentPage { comments, has_more })
    }
}

/// Replies are indented; only rows at depth zero are job posts.
fn is_top_level(row: &ElementRef) -> bool {
    let Some(cell) = row.select(&INDENT).next() else {
        return true;
    };
    if let Some(indent) = cell.value().attr("indent") {
        return indent == "0";
    }
    match cell.select(&SPACER).next() {
        Some(img) => img.value().attr("width") == Some("0"),
        None => true,
    }
}

fn parse_month(month: &str, year: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("1 {} {}", month, year), "%d %B %Y").ok()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{comments_html, thread_list_html};

    fn parser() -> HnParser {
        HnParser::new("https://news.ycombinator.com/")
    }

    #[test]
    fn thread_list_keeps_hiring_threads_only() {
        let html = thread_list_html(
            &[
                ("39562986", "Ask HN: Who is hiring? (March 2024)"),
                ("39562985", "Ask HN: Who wants to be hired? (March 2024)"),
                ("39217310", "Ask HN: Who is hiring? (February 2024)"),
            ],
            Some("submitted?id=whoishiring&next=39217309"),
        );
        let page = parser().parse_thread_list(&html).unwrap();

        let ids: Vec<&str> = page.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["39562986", "39217310"]);
        assert_eq!(
            page.threads[0].thread_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            page.threads[0].url,
            "https://news.ycombinator.com/item?id=39562986"
        );
        assert_eq!(
            page.next.as_deref(),
            Some("submitted?id=whoishiring&next=39217309")
        );
    }

    #[test]
    fn thread_list_legacy_title_link() {
        let html = r#"<html><body><table>
            <tr class="athing" id="22225314"><td class="title">
              <a href="item?id=22225314" class="titlelink">Ask HN: Who is hiring? (February 2020)</a>
            </td></tr>
            </table></body></html>"#;
        let page = parser().parse_thread_list(html).unwrap();
        assert_eq!(page.threads.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn thread_list_without_rows_is_parse_error() {
        let err = parser().parse_thread_list("<html><body>Sorry.</body></html>");
        assert!(err.is_err());
    }

    #[test]
    fn comments_top_level_only() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let html = comments_html(
            "39562986",
            &[
                ("100", "alice", "Acme | Rust Engineer | Remote", 0),
                ("101", "bob", "Is this still open?", 1),
                ("102", "carol", "Globex | SRE | NYC", 0),
            ],
            true,
        );
        let page = parser().parse_comments(&html, date).unwrap();

        assert!(page.has_more);
        let ids: Vec<&str> = page.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "102"]);

        let first = &page.comments[0];
        assert_eq!(first.user, "alice");
        assert_eq!(first.raw_text, "Acme | Rust Engineer | Remote");
        assert_eq!(first.thread_date, date);
        assert_eq!(first.url, "https://news.ycombinator.com/item?id=100");
    }

    #[test]
    fn comment_paragraphs_joined_by_newline() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let html = comments_html(
            "1",
            &[("5", "dave", "Initech | Backend<p>Python, Postgres", 0)],
            false,
        );
        let page = parser().parse_comments(&html, date).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.comments[0].raw_text, "Initech | Backend\nPython, Postgres");
    }

    #[test]
    fn story_without_comments_is_empty_not_error() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let html = comments_html("1", &[], false);
        let page = parser().parse_comments(&html, date).unwrap();
        assert!(page.comments.is_empty());
        assert!(!page.has_more);
    }
}
