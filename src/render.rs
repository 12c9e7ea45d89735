//! HTML digest formatting.

use crate::network::NewsItem;
use crate::utils::escape_html;

const NO_DESCRIPTION: &str = "No description";

/// Render the digest body. Pure; never fails.
pub fn render(items: &[NewsItem]) -> String {
    let mut output = String::with_capacity(512 + items.len() * 256);
    output.push_str("<h2>📰 Daily Trending News</h2>\n");
    output.push_str("<p>Here’s your quick news digest for today:</p>\n<ul>\n");

    for item in items {
        let desc = item
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(NO_DESCRIPTION);

        output.push_str(&format!(
            "  <li>\n    <strong>{}</strong><br>\n    {}<br>\n    <a href=\"{}\">Read more</a>\n  </li>\n",
            escape_html(&item.title),
            escape_html(desc),
            escape_html(&item.url),
        ));
    }

    output.push_str("</ul>\n<p>— Your Daily News Bot</p>\n");
    output
}
