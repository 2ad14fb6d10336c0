//! HTML rendering of the compose page.

use crate::model::{ALLOWED_EXTENSIONS, Banner, ComposeForm};
use std::fmt::Write as _;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:1rem;font-weight:600}\
input[type=text],input[type=email],textarea{width:100%;padding:.5rem;box-sizing:border-box}\
textarea{min-height:10rem}\
button{margin-top:1.5rem;padding:.6rem 1.4rem}\
.banner{padding:.75rem 1rem;border-radius:4px;margin:1rem 0}\
.sent{background:#e6f4ea;color:#1e4620}\
.error{background:#fce8e6;color:#5f2120}\
footer{margin-top:2rem;color:#666;font-size:.9rem}";

/// Escapes text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders the full compose page.
#[must_use]
pub fn render_page(form: &ComposeForm, banner: Option<&Banner>, sender: &str) -> String {
    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Gmail OAuth2 Email Sender</title>\n");
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
    html.push_str("<h1>Gmail OAuth2 Email Sender</h1>\n");
    let _ = writeln!(html, "<p>Sending as <strong>{}</strong></p>", escape_html(sender));

    match banner {
        Some(Banner::Sent(id)) => {
            let _ = writeln!(
                html,
                "<div class=\"banner sent\" role=\"status\">Email sent successfully! Message ID: {}</div>",
                escape_html(id)
            );
        }
        Some(Banner::Error(message)) => {
            let _ = writeln!(
                html,
                "<div class=\"banner error\" role=\"alert\">{}</div>",
                escape_html(message)
            );
        }
        None => {}
    }

    html.push_str("<form method=\"post\" action=\"/send\" enctype=\"multipart/form-data\">\n");
    let _ = writeln!(
        html,
        "<label for=\"to\">Recipient Email</label>\n<input type=\"email\" id=\"to\" name=\"to\" value=\"{}\">",
        escape_html(&form.to)
    );
    let _ = writeln!(
        html,
        "<label for=\"subject\">Subject</label>\n<input type=\"text\" id=\"subject\" name=\"subject\" value=\"{}\">",
        escape_html(&form.subject)
    );
    let _ = writeln!(
        html,
        "<label for=\"body\">Message</label>\n<textarea id=\"body\" name=\"body\">{}</textarea>",
        escape_html(&form.body)
    );
    let _ = writeln!(
        html,
        "<label for=\"attachment\">Upload a file (optional)</label>\n<input type=\"file\" id=\"attachment\" name=\"attachment\" accept=\"{accept}\">"
    );
    html.push_str("<button type=\"submit\">Send Email</button>\n</form>\n");
    html.push_str(
        "<footer><hr>This app uses Gmail OAuth2. Your credentials remain local and are never \
         uploaded anywhere.</footer>\n</body>\n</html>\n",
    );
    html
}
