//! Offer letter rendering.

use crate::offers::docusign::SIGNATURE_ANCHOR;

/// Values substituted into the default letter.
#[derive(Debug, Clone, Default)]
pub struct LetterDetails<'a> {
    pub organization_name: &'a str,
    pub candidate_name: &'a str,
    pub job_title: Option<&'a str>,
    pub salary: Option<&'a str>,
    pub start_date: Option<&'a str>,
}

/// Renders the letter body. `custom` replaces the default body; the signature
/// anchor is appended when the caller's content lacks one.
pub fn render_letter(details: &LetterDetails<'_>, custom: Option<&str>) -> String {
    let body = match custom.map(str::trim).filter(|c| !c.is_empty()) {
        Some(content) if looks_like_html(content) => content.to_string(),
        Some(content) => format!(
            "<p>{}</p>",
            escape_html(content).replace("\n\n", "</p><p>").replace('\n', "<br>")
        ),
        None => default_body(details),
    };

    let mut body = body;
    if !body.contains(SIGNATURE_ANCHOR) {
        body.push_str(&signature_block());
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>\
         <body style=\"font-family: Helvetica, Arial, sans-serif; line-height: 1.5;\">{body}</body></html>"
    )
}

fn default_body(details: &LetterDetails<'_>) -> String {
    let org = escape_html(details.organization_name);
    let candidate = escape_html(details.candidate_name);
    let title = details
        .job_title
        .map(escape_html)
        .unwrap_or_else(|| "the position".to_string());

    let mut terms = String::new();
    if let Some(salary) = details.salary {
        terms.push_str(&format!("<li>Annual salary: {}</li>", escape_html(salary)));
    }
    if let Some(start) = details.start_date {
        terms.push_str(&format!("<li>Start date: {}</li>", escape_html(start)));
    }
    let terms = if terms.is_empty() {
        String::new()
    } else {
        format!("<ul>{terms}</ul>")
    };

    format!(
        "<h2>{org}</h2>\
         <p>Dear {candidate},</p>\
         <p>We are delighted to offer you the role of <strong>{title}</strong> at {org}.</p>\
         {terms}\
         <p>Please review this letter and sign below to accept the offer.</p>\
         <p>Sincerely,<br>{org}</p>\
         {signature}",
        signature = signature_block()
    )
}

fn signature_block() -> String {
    format!(
        "<p style=\"margin-top: 48px;\">Accepted by: \
         <span style=\"color: white;\">{SIGNATURE_ANCHOR}</span></p>"
    )
}

fn looks_like_html(content: &str) -> bool {
    content.starts_with('<') && content.contains('>')
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
