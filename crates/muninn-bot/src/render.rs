//! Message rendering helpers: named-placeholder templates, HTML escaping,
//! `matrix.to` links, and the plain-text fallback body.

use std::fmt::Write;

use muninn_core::protocol::{RoomId, UserId};

/// Escape text for HTML bodies and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Fill `{name}` placeholders. `{{` and `}}` produce literal braces.
/// Unknown placeholders are left as written.
pub fn format_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if let Some(stripped) = tail.strip_prefix('{') {
            match stripped.find('}') {
                Some(end) => {
                    let name = &stripped[..end];
                    match vars.iter().find(|(k, _)| *k == name) {
                        Some((_, v)) => out.push_str(v),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &stripped[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

/// `https://matrix.to/#/<id>` with optional `via` routing hints.
pub fn matrix_to_url(identifier: &str, via: &[String]) -> String {
    let mut url = format!("https://matrix.to/#/{}", percent_encode(identifier));
    for (i, server) in via.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        let _ = write!(url, "via={}", percent_encode(server));
    }
    url
}

pub fn room_link(room_id: &RoomId, via: &[String]) -> String {
    matrix_to_url(room_id.as_str(), via)
}

/// HTML mention pill: `<a href="matrix.to link">label</a>`. `label` must be
/// already escaped.
pub fn mention_html(user_id: &UserId, label_html: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        matrix_to_url(user_id.as_str(), &[]),
        label_html
    )
}

/// Mention labelled with the escaped user id.
pub fn user_mention(user_id: &UserId) -> String {
    mention_html(user_id, &escape_html(user_id.as_str()))
}

/// Plain-text fallback body for an HTML message: paragraphs and list items
/// become line breaks, other tags are dropped.
pub fn html_to_plain(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('>') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let tag = rest[start + 1..start + len].trim().to_ascii_lowercase();
        let tag_name = tag.split_whitespace().next().unwrap_or("").trim_end_matches('/');
        match tag_name {
            "/p" | "/summary" | "/details" => out.push_str("\n\n"),
            "br" | "/li" => out.push('\n'),
            "li" => out.push_str("- "),
            _ => {}
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);

    let text = unescape_html(&out);
    let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
        } else if let Some(p) = paragraphs.last_mut() {
            p.push(line);
        }
    }
    paragraphs
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fills_named_placeholders() {
        let out = format_template("Hi {user}, from {server}!", &[("user", "A"), ("server", "b.org")]);
        assert_eq!(out, "Hi A, from b.org!");
    }

    #[test]
    fn template_keeps_unknown_and_escaped_braces() {
        let out = format_template("{{literal}} {missing} {user}", &[("user", "x")]);
        assert_eq!(out, "{literal} {missing} x");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<b>\"it's\" & co</b>"), "&lt;b&gt;&quot;it&#x27;s&quot; &amp; co&lt;/b&gt;");
    }

    #[test]
    fn matrix_to_encodes_ids_and_via() {
        assert_eq!(
            matrix_to_url("@alice:example.com", &[]),
            "https://matrix.to/#/%40alice%3Aexample.com"
        );
        assert_eq!(
            matrix_to_url("!room:example.com", &["a.org".into(), "b.org".into()]),
            "https://matrix.to/#/%21room%3Aexample.com?via=a.org&via=b.org"
        );
    }

    #[test]
    fn plain_body_from_paragraphs() {
        let html = "<p>Welcome <a href=\"x\">@a:b</a></p><p>Tom &amp; Jerry</p><p>Bye</p>";
        assert_eq!(html_to_plain(html), "Welcome @a:b\n\nTom & Jerry\n\nBye");
    }
}
