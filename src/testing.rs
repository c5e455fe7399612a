//! Test doubles and HN-shaped markup builders.

use std::collections::{HashMap, VecDeque};

use crate::error::FetchError;
use crate::transport::Fetch;

/// Replays queued responses per URL and records every request.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, VecDeque<Result<String, FetchError>>>,
    pub calls: Vec<String>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, url: &str, body: impl Into<String>) -> Self {
        self.push(url, Ok(body.into()));
        self
    }

    pub fn transient(mut self, url: &str, times: usize) -> Self {
        for _ in 0..times {
            self.push(
                url,
                Err(FetchError::Transient {
                    url: url.to_string(),
                    reason: "HTTP 503 Service Unavailable".to_string(),
                }),
            );
        }
        self
    }

    pub fn fatal(mut self, url: &str) -> Self {
        self.push(
            url,
            Err(FetchError::Fatal {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        );
        self
    }

    pub fn push(&mut self, url: &str, response: Result<String, FetchError>) {
        self.responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn count(&self, url: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == url).count()
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String, FetchError> {
        self.calls.push(url.to_string());
        self.responses
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(FetchError::Fatal {
                    url: url.to_string(),
                    reason: "no scripted response".to_string(),
                })
            })
    }
}

/// Submissions page with one row per (id, title).
pub fn thread_list_html(threads: &[(&str, &str)], more: Option<&str>) -> String {
    let mut html = String::from("<html><body><table id=\"hnmain\">");
    for (id, title) in threads {
        html.push_str(&format!(
            "<tr class=\"athing submission\" id=\"{id}\"><td class=\"title\">\
             <span class=\"titleline\"><a href=\"item?id={id}\">{title}</a></span></td></tr>"
        ));
    }
    if let Some(href) = more {
        html.push_str(&format!(
            "<tr><td class=\"title\"><a href=\"{href}\" class=\"morelink\" rel=\"next\">More</a></td></tr>"
        ));
    }
    html.push_str("</table></body></html>");
    html
}

/// Thread page: the story row followed by (id, user, text, depth) comments.
pub fn comments_html(story_id: &str, comments: &[(&str, &str, &str, u32)], more: bool) -> String {
    let mut html = format!(
        "<html><body><table id=\"hnmain\">\
         <tr class=\"athing submission\" id=\"{story_id}\"><td class=\"title\">\
         <span class=\"titleline\"><a href=\"item?id={story_id}\">Ask HN: Who is hiring?</a></span>\
         </td></tr></table><table class=\"comment-tree\">"
    );
    for (id, user, text, depth) in comments {
        let width = depth * 40;
        html.push_str(&format!(
            "<tr class=\"athing comtr\" id=\"{id}\"><td><table><tr>\
             <td class=\"ind\" indent=\"{depth}\"><img src=\"s.gif\" height=\"1\" width=\"{width}\"></td>\
             <td class=\"default\"><div><span class=\"comhead\">\
             <a href=\"user?id={user}\" class=\"hnuser\">{user}</a> \
             <span class=\"age\"><a href=\"item?id={id}\">1 day ago</a></span></span></div>\
             <div class=\"comment\"><div class=\"commtext c00\">{text}</div></div></td>\
             </tr></table></td></tr>"
        ));
    }
    if more {
        html.push_str(&format!(
            "<tr><td><a href=\"item?id={story_id}&amp;p=2\" class=\"morelink\" rel=\"next\">More</a></td></tr>"
        ));
    }
    html.push_str("</table></body></html>");
    html
}
