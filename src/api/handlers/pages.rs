use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Router};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::db::count;
use crate::html::{self, escape};

const LINKS: [(&str, &str); 3] = [
    ("/health-council", "Health Council"),
    ("/media-kit/preview", "Media Kit"),
    ("/api/sponsors/alerts", "Sponsor alerts (JSON)"),
];

const STYLE: &str = "
body { margin: 0; background: #0d1117; color: #e6edf3; font-family: system-ui, sans-serif; }
.wrap { max-width: 720px; margin: 0 auto; padding: 40px 24px; }
a { color: #58a6ff; }
.counts { display: flex; gap: 24px; color: #8b949e; font-size: 14px; }
";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

fn render_index(counts: &[(&str, i64)]) -> String {
    let mut body = String::from("<div class=\"wrap\"><h1>Production Hub</h1>\n<div class=\"counts\">");
    for (label, n) in counts {
        body.push_str(&format!("<span>{} {}</span>", html::thousands(*n), escape(label)));
    }
    body.push_str("</div>\n<ul>\n");
    for (href, label) in LINKS {
        body.push_str(&format!("<li><a href=\"{}\">{}</a></li>\n", href, label));
    }
    body.push_str("</ul>\n</div>");
    html::document("Production Hub", STYLE, &body)
}

async fn index(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let counts = {
        let conn = state.db()?;
        [
            ("open tasks", count(&conn, "SELECT COUNT(*) FROM tasks WHERE stage != 'done'")?),
            ("series", count(&conn, "SELECT COUNT(*) FROM series")?),
            (
                "active deals",
                count(&conn, "SELECT COUNT(*) FROM sponsors WHERE stage != 'paid'")?,
            ),
        ]
    };
    Ok(Html(render_index(&counts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_links_every_page() {
        let page = render_index(&[("series", 1200)]);
        assert!(page.contains("1,200 series"));
        for (href, _) in LINKS {
            assert!(page.contains(href));
        }
    }
}
