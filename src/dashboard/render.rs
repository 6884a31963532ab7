use crate::models::{parse_quarter_number, InsightRecord, QuarterKey};
use crate::store::TickerQuarterMap;

/// The ticker/year/quarter currently shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ticker: String,
    pub year: i32,
    pub quarter: u8,
}

impl Selection {
    pub fn key(&self) -> QuarterKey {
        QuarterKey {
            year: self.year,
            quarter: self.quarter,
        }
    }
}

/// What the record panel shows
#[derive(Debug, Clone)]
pub enum RecordView {
    Found(Box<InsightRecord>),
    NotFound,
    Error(String),
    Empty,
}

/// Everything needed to render the dashboard page
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub tickers: TickerQuarterMap,
    pub selection: Option<Selection>,
    pub record: RecordView,
    /// Page-level error, e.g. API unreachable
    pub banner: Option<String>,
}

/// Pick the selection from request parameters, falling back to the first
/// ticker and its latest year and quarter
pub fn resolve_selection(
    tickers: &TickerQuarterMap,
    ticker: Option<&str>,
    year: Option<&str>,
    quarter: Option<&str>,
) -> Option<Selection> {
    let requested = ticker.map(|t| t.trim().to_uppercase());
    let (ticker, years) = match requested.as_deref().and_then(|t| tickers.get_key_value(t)) {
        Some(found) => found,
        None => tickers.iter().next()?,
    };

    let requested_year = year.and_then(|y| y.trim().parse::<i32>().ok());
    let (year, quarters) = match requested_year.and_then(|y| years.get_key_value(&y)) {
        Some(found) => found,
        None => years.iter().next_back()?,
    };

    let available: Vec<u8> = quarters
        .iter()
        .filter_map(|q| parse_quarter_number(q))
        .collect();
    let quarter = quarter
        .and_then(parse_quarter_number)
        .filter(|q| available.contains(q))
        .or_else(|| available.last().copied())?;

    Some(Selection {
        ticker: ticker.clone(),
        year: *year,
        quarter,
    })
}

/// Escape HTML special characters
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
form { display: flex; gap: 1rem; margin-bottom: 1.5rem; }
label { display: flex; flex-direction: column; font-size: 0.85rem; color: #555; }
.summary { background-color: #f8f9fa; padding: 1rem; border-left: 4px solid #4CAF50; white-space: pre-wrap; }
.banner { background: #fdecea; color: #611a15; padding: 0.75rem 1rem; border-radius: 4px; }
.notice { background: #e8f4fd; color: #0c3c60; padding: 0.75rem 1rem; border-radius: 4px; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; border-bottom: 1px solid #ddd; padding: 0.5rem; vertical-align: top; }
th { width: 10rem; color: #555; }
pre { background: #f4f4f4; padding: 1rem; overflow-x: auto; }
"#;

/// Render the full dashboard page
pub fn render_page(view: &DashboardView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Earnings Call Insight Dashboard</title>\n");
    html.push_str(&format!("<style>{}</style>\n", STYLE));
    html.push_str("</head>\n<body>\n<h1>Earnings Call Insight Dashboard</h1>\n");

    if let Some(banner) = &view.banner {
        html.push_str(&format!("<div class=\"banner\">{}</div>\n", escape_html(banner)));
    }

    if view.tickers.is_empty() {
        if view.banner.is_none() {
            html.push_str(
                "<div class=\"notice\">No companies or quarters found. \
                 Run the pipeline to load data into the database.</div>\n",
            );
        }
        html.push_str("</body>\n</html>\n");
        return html;
    }

    if let Some(selection) = &view.selection {
        render_selectors(&mut html, &view.tickers, selection);
    }

    match &view.record {
        RecordView::Found(record) => render_record(&mut html, record),
        RecordView::NotFound => {
            let label = view
                .selection
                .as_ref()
                .map(|s| format!("{} - {}", s.ticker, s.key()))
                .unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"notice\">No record found for {}.</div>\n",
                escape_html(&label)
            ));
        }
        RecordView::Error(message) => {
            html.push_str(&format!(
                "<div class=\"banner\">Error fetching record: {}</div>\n",
                escape_html(message)
            ));
        }
        RecordView::Empty => {
            html.push_str(
                "<div class=\"notice\">Select a company, year, and quarter to view insights.</div>\n",
            );
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_selectors(html: &mut String, tickers: &TickerQuarterMap, selection: &Selection) {
    html.push_str("<form method=\"get\" action=\"/\">\n");

    let ticker_options: Vec<(String, String)> =
        tickers.keys().map(|t| (t.clone(), t.clone())).collect();
    render_select(html, "Company", "ticker", &ticker_options, &selection.ticker);

    let years = tickers.get(&selection.ticker);
    let year_options: Vec<(String, String)> = years
        .map(|y| y.keys().map(|y| (y.to_string(), y.to_string())).collect())
        .unwrap_or_default();
    render_select(html, "Year", "year", &year_options, &selection.year.to_string());

    let quarter_options: Vec<(String, String)> = years
        .and_then(|y| y.get(&selection.year))
        .map(|qs| qs.iter().map(|q| (q.clone(), q.clone())).collect())
        .unwrap_or_default();
    render_select(
        html,
        "Quarter",
        "quarter",
        &quarter_options,
        &selection.key().quarter_label(),
    );

    html.push_str("<noscript><button type=\"submit\">Show</button></noscript>\n</form>\n");
}

fn render_select(
    html: &mut String,
    label: &str,
    name: &str,
    options: &[(String, String)],
    selected: &str,
) {
    html.push_str(&format!(
        "<label>{}<select name=\"{}\" onchange=\"this.form.submit()\">",
        label, name
    ));
    for (value, text) in options {
        let marker = if value == selected { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            escape_html(value),
            marker,
            escape_html(text)
        ));
    }
    html.push_str("</select></label>\n");
}

fn render_record(html: &mut String, record: &InsightRecord) {
    html.push_str(&format!(
        "<h2>Summary for {} ({})</h2>\n",
        escape_html(&record.ticker),
        escape_html(&record.quarter_key)
    ));
    if let Some(company) = &record.company {
        html.push_str(&format!("<p>{}</p>\n", escape_html(company)));
    }
    let summary = if record.summary.is_empty() {
        "No summary available."
    } else {
        record.summary.as_str()
    };
    html.push_str(&format!("<div class=\"summary\">{}</div>\n", escape_html(summary)));

    html.push_str("<h2>Extracted Insights</h2>\n");
    let insights = &record.insights;
    if insights.is_empty() {
        html.push_str("<div class=\"notice\">No insights available.</div>\n");
    } else {
        html.push_str("<table>\n");
        let risks = if insights.key_risks.is_empty() {
            None
        } else {
            Some(format!(
                "<ul>{}</ul>",
                insights
                    .key_risks
                    .iter()
                    .map(|r| format!("<li>{}</li>", escape_html(r)))
                    .collect::<String>()
            ))
        };
        let rows = [
            ("EPS", insights.eps.as_deref().map(escape_html)),
            ("Revenue", insights.revenue.as_deref().map(escape_html)),
            ("Guidance", insights.guidance.as_deref().map(escape_html)),
            ("Key risks", risks),
            ("CEO quote", insights.ceo_quote.as_deref().map(escape_html)),
        ];
        for (name, value) in rows {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                name,
                value.unwrap_or_else(|| "&mdash;".to_string())
            ));
        }
        for (key, value) in &insights.extra {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                escape_html(key),
                escape_html(&text)
            ));
        }
        html.push_str("</table>\n");
    }

    let raw = serde_json::to_string_pretty(record).unwrap_or_default();
    html.push_str(&format!(
        "<details><summary>View raw JSON</summary><pre>{}</pre></details>\n",
        escape_html(&raw)
    ));
}
