//! HTML pages served to contributors.
//!
//! The UI is deliberately tiny: an error surface, the shipping form, and a
//! thank-you page. Everything is rendered from `format!` templates; there is
//! not enough markup here to justify a template engine.

/// Escapes text interpolated into markup.
fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 36rem; margin: 4rem auto; padding: 0 1rem; }}
label {{ display: block; margin-top: 1rem; }}
input, select {{ width: 100%; padding: 0.4rem; margin-top: 0.25rem; }}
button {{ margin-top: 1.5rem; padding: 0.5rem 1.5rem; }}
.contact {{ margin-top: 2rem; color: #666; font-size: 0.9rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

/// Error surface; the message is one of the fixed public strings, never an
/// internal error rendering.
pub fn error_page(contact_url: &str, contact_value: &str, message: &str) -> String {
    let body = format!(
        r#"<h1>Oops</h1>
<p>{}</p>
<p class="contact">Questions? Reach us at <a href="{}">{}</a>.</p>"#,
        escape(message),
        escape(contact_url),
        escape(contact_value)
    );
    page("Oops", &body)
}

/// Shipping-details form shown to an eligible contributor.
pub fn form_page() -> String {
    let body = r#"<h1>Claim your reward</h1>
<p>Thanks for contributing! Tell us where to send your reward.</p>
<form method="post" action="/award">
<label>Full name<input type="text" name="name" required></label>
<label>Shipping address<input type="text" name="address" required></label>
<label>Email<input type="email" name="email" required></label>
<label>Shirt size
<select name="size">
<option>S</option>
<option selected>M</option>
<option>L</option>
<option>XL</option>
</select>
</label>
<button type="submit">Send it my way</button>
</form>"#;
    page("Claim your reward", body)
}

/// Shown exactly once, right after a submission is accepted.
pub fn success_page() -> String {
    let body = r#"<h1>All set!</h1>
<p>Your reward is on its way. Thanks again for contributing!</p>"#;
    page("All set!", body)
}
