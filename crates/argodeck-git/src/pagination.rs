//! RFC 8288 `Link` header handling
//!
//! Both backends advertise continuation through `Link` headers. GitHub puts a page
//! number in the `rel="next"` target; GitLab keyset pagination puts an opaque
//! token there. The adapters decide what to extract.

use reqwest::header::{HeaderMap, LINK};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub rels: Vec<String>,
}

impl Link {
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(rel))
    }
}

pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let target = after[..end].trim().to_string();
        let tail = &after[end + 1..];
        let (params, next) = match tail.find('<') {
            Some(i) => (&tail[..i], &tail[i..]),
            None => (tail, ""),
        };

        let rels = params
            .split(';')
            .filter_map(|param| {
                let (key, value) = param.trim().split_once('=')?;
                key.trim().eq_ignore_ascii_case("rel").then(|| {
                    value
                        .trim()
                        .trim_end_matches(',')
                        .trim()
                        .trim_matches('"')
                        .to_string()
                })
            })
            .flat_map(|value| {
                value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        links.push(Link { target, rels });
        rest = next;
    }

    links
}

/// The `rel="next"` target advertised by a response, if any
pub fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_link_header)
        .find(|link| link.has_rel("next"))
        .and_then(|link| Url::parse(&link.target).ok())
}

pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}
