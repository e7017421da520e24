//! HTML rendering for the inspection views.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};

use crate::capture::codec;
use crate::inspect::payload::{ChatChoice, ChatMessage, ChatRequest, ChatResponse, Usage};
use crate::storage::CallRecord;

/// Listing previews, in bytes.
const REQUEST_PREVIEW: usize = 600;
const RESPONSE_PREVIEW: usize = 400;

/// Shown when a stored body carries the gzip signature but does not inflate.
pub const UNDECODABLE_MARKER: &str = "(undecodable gzip)";

const LIST_STYLE: &str = r#"
table {
  border-collapse: collapse;
}
td {
  border: 1px solid black;
  padding: 8px;
  vertical-align: top;
}
pre {
  overflow: hidden;
  white-space: pre-wrap;
  max-width: 50ch;
}"#;

const SHOW_STYLE: &str = r#"
table {
  border-collapse: collapse;
}
td {
  border: 1px solid black;
  padding: 8px;
  vertical-align: top;
}
pre {
  white-space: pre-wrap;
}"#;

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// At most `max_bytes` of `text`, cut on a character boundary.
pub fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Timestamp in the server's local zone.
pub fn local_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S %:z")
        .to_string()
}

fn list_row(out: &mut String, record: &CallRecord) {
    let request = codec::display_text(&record.request_body);
    let (response_len, response) = match codec::decode_for_display(&record.response_body) {
        Ok(decoded) => (decoded.len(), codec::display_text(&decoded).into_owned()),
        Err(e) => {
            tracing::warn!(id = record.id, error = %e, "Stored response does not decode");
            (record.response_body.len(), UNDECODABLE_MARKER.to_string())
        }
    };

    let _ = write!(
        out,
        "<tr><td><pre><a href=\"/_show/{id}\">#{id}</a>\n\n{ts}\n\n{path}\n\n{duration} ms</pre></td>\
         <td><pre>request: {request_len} bytes\n\n{request}</pre></td>\
         <td><pre>response: {response_len} bytes\n\n{response}</pre></td></tr>",
        id = record.id,
        ts = local_timestamp(record.timestamp),
        path = escape_html(&record.url_path),
        duration = record.duration_ms,
        request_len = record.request_body.len(),
        request = escape_html(truncate(&request, REQUEST_PREVIEW)),
        response = escape_html(truncate(&response, RESPONSE_PREVIEW)),
    );
}

/// The `/_list` page.
pub fn render_list(records: &[CallRecord]) -> String {
    let mut rows = String::new();
    for record in records {
        list_row(&mut rows, record);
    }
    if records.is_empty() {
        rows.push_str("<tr><td colspan=\"3\">No results</td></tr>");
    }
    format!("<html><head><style>{LIST_STYLE}</style></head><body><table>{rows}</table></body></html>")
}

fn render_messages(messages: &[ChatMessage]) -> String {
    let mut out = String::from("<table>");
    for message in messages {
        let _ = write!(
            out,
            "<tr><td><pre>{}</pre></td><td><pre>{}</pre></td></tr>",
            escape_html(&message.role),
            escape_html(&message.content),
        );
    }
    out.push_str("</table>");
    out
}

fn render_choices(choices: &[ChatChoice]) -> String {
    let mut out = String::from("<table>");
    for choice in choices {
        let _ = write!(
            out,
            "<tr><td><pre>{}</pre></td><td><pre>{}</pre></td><td><pre>{}</pre></td></tr>",
            choice.index,
            escape_html(&choice.message.role),
            escape_html(&choice.message.content),
        );
    }
    out.push_str("</table>");
    out
}

fn render_usage(usage: &Usage) -> String {
    format!(
        "<dl><dt>Prompt Tokens:</dt><dd>{}</dd><dt>Completion Tokens:</dt><dd>{}</dd>\
         <dt>Total Tokens:</dt><dd>{}</dd></dl>",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens,
    )
}

/// Inputs for the `/_show/{id}` page.
pub struct CallDetail<'a> {
    pub record: &'a CallRecord,
    pub response_len: usize,
    pub request: &'a ChatRequest,
    pub response: &'a ChatResponse,
}

/// The `/_show/{id}` page.
pub fn render_show(detail: &CallDetail<'_>) -> String {
    let request = detail.request;
    let response = detail.response;
    let record = detail.record;

    let request_html = format!(
        "<dl><dt>Model:</dt><dd>{}</dd><dt>Messages:</dt><dd>{}</dd>\
         <dt>Temperature:</dt><dd>{:.6}</dd></dl>",
        escape_html(&request.model),
        render_messages(&request.messages),
        request.temperature,
    );

    let response_html = format!(
        "<dl><dt>ID:</dt><dd>{}</dd><dt>Object:</dt><dd>{}</dd><dt>Created:</dt><dd>{}</dd>\
         <dt>Model:</dt><dd>{}</dd><dt>Choices:</dt><dd>{}</dd><dt>Usage:</dt><dd>{}</dd></dl>",
        escape_html(&response.id),
        escape_html(&response.object),
        response.created,
        escape_html(&response.model),
        render_choices(&response.choices),
        render_usage(&response.usage),
    );

    format!(
        "<html><head><style>{SHOW_STYLE}</style></head><body><dl>\
         <dt>ID:</dt><dd>{id}</dd><dt>Timestamp:</dt><dd>{ts}</dd>\
         <dt>URL Path:</dt><dd>{path}</dd><dt>Duration (ms):</dt><dd>{duration}</dd>\
         <dt>Request:</dt><dd><p>{request_len} bytes</p>{request_html}</dd>\
         <dt>Response:</dt><dd><p>{response_len} bytes</p>{response_html}</dd>\
         </dl></body></html>",
        id = record.id,
        ts = local_timestamp(record.timestamp),
        path = escape_html(&record.url_path),
        duration = record.duration_ms,
        request_len = record.request_body.len(),
        response_len = detail.response_len,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, request: &[u8], response: &[u8]) -> CallRecord {
        CallRecord {
            id,
            timestamp: Utc::now(),
            url_path: "/chat/completions".into(),
            duration_ms: 12,
            request_body: request.to_vec(),
            response_body: response.to_vec(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate("hé!", 2), "h");
    }

    #[test]
    fn empty_list_says_no_results() {
        assert!(render_list(&[]).contains("No results"));
    }

    #[test]
    fn list_previews_are_escaped_and_truncated() {
        let long_request = format!("<{}>", "x".repeat(1000));
        let page = render_list(&[record(5, long_request.as_bytes(), b"ok")]);

        assert!(page.contains("<a href=\"/_show/5\">#5</a>"));
        assert!(page.contains("request: 1002 bytes"));
        assert!(page.contains(&format!("&lt;{}", "x".repeat(599))));
        assert!(!page.contains(&"x".repeat(600)));
    }

    #[test]
    fn list_marks_invalid_utf8_and_decodes_gzip() {
        let gzipped = codec::gzip(b"{\"inflated\":true}").unwrap();
        let page = render_list(&[
            record(1, b"{}", &[0xff, 0xfe]),
            record(2, b"{}", &gzipped),
        ]);
        assert!(page.contains(codec::INVALID_UTF8_MARKER));
        assert!(page.contains("{&#34;inflated&#34;:true}"));
    }

    #[test]
    fn list_tolerates_corrupt_gzip() {
        let mut corrupt = codec::GZIP_SIGNATURE.to_vec();
        corrupt.extend_from_slice(b"garbage");
        let page = render_list(&[record(3, b"{}", &corrupt)]);
        assert!(page.contains(UNDECODABLE_MARKER));
    }

    #[test]
    fn show_renders_conversation() {
        let record = record(8, b"{}", b"{}");
        let request = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "2 < 3?".into(),
            }],
            temperature: 0.5,
        };
        let response = ChatResponse {
            id: "chatcmpl-1".into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".into(),
                    content: "yes".into(),
                },
                finish_reason: "stop".into(),
            }],
            usage: Usage {
                prompt_tokens: 4,
                completion_tokens: 1,
                total_tokens: 5,
            },
            ..ChatResponse::default()
        };

        let page = render_show(&CallDetail {
            record: &record,
            response_len: 2,
            request: &request,
            response: &response,
        });

        assert!(page.contains("<dd>gpt-4o</dd>"));
        assert!(page.contains("2 &lt; 3?"));
        assert!(page.contains("<dd>0.500000</dd>"));
        assert!(page.contains("<pre>assistant</pre>"));
        assert!(page.contains("<dt>Total Tokens:</dt><dd>5</dd>"));
    }
}
