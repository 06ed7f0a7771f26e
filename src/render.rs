//! HTML rendering of the landing page and aggregation results

use crate::{
    constants::USD,
    types::{AggregateResult, Listing, SortOrder},
};
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem}\
table{border-collapse:collapse}\
td,th{padding:.25rem .75rem;border-bottom:1px solid #ddd;text-align:right}\
td:nth-child(2),th:nth-child(2){text-align:left}";

/// Escapes text for use in HTML element content and attribute values
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

fn query_form() -> String {
    let mut options = String::new();
    for order in SortOrder::all() {
        let _ = write!(options, "<option value=\"{0}\">{0}</option>", order.as_str());
    }
    format!(
        "<form method=\"get\" action=\"/api/get-listings\">\n\
         <label>API key <input name=\"api-key\" type=\"password\" required></label>\n\
         <label>Limit <input name=\"limit\" type=\"number\" min=\"1\" value=\"10\" required></label>\n\
         <label>Order <select name=\"order\">{}</select></label>\n\
         <button type=\"submit\">Fetch listings</button>\n\
         </form>",
        options
    )
}

/// Landing page with the listings query form
pub fn render_landing() -> String {
    page(
        "Crypto listings",
        &format!("<h1>Crypto listings</h1>\n{}", query_form()),
    )
}

fn listing_row(out: &mut String, listing: &Listing) {
    let (price, market_cap, change_24h) = listing
        .quote_in(USD)
        .map(|q| {
            (
                format!("{:.4}", q.price),
                format!("{:.0}", q.market_cap),
                format!("{:+.2}%", q.percent_change_24h),
            )
        })
        .unwrap_or_else(|| ("-".to_string(), "-".to_string(), "-".to_string()));

    let _ = write!(
        out,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        listing.cmc_rank,
        escape_html(&listing.name),
        escape_html(&listing.symbol),
        price,
        market_cap,
        change_24h
    );
}

/// Result page: statistics, comparison price and the listing table
pub fn render_result(result: &AggregateResult) -> String {
    let stats = &result.statistics;
    let mut body = String::from("<h1>Crypto listings</h1>\n");

    let _ = write!(
        body,
        "<h2>USD price statistics</h2>\n<dl>\n\
         <dt>Average</dt><dd>{:.4}</dd>\n\
         <dt>Median</dt><dd>{:.4}</dd>\n\
         <dt>Standard deviation</dt><dd>{:.4}</dd>\n\
         <dt>Max</dt><dd>{:.4}</dd>\n\
         <dt>Min</dt><dd>{:.4}</dd>\n</dl>\n",
        stats.average, stats.median, stats.standard_deviation, stats.max, stats.min
    );

    if let Some(primary) = result.listings.primary() {
        let _ = write!(
            body,
            "<p>{} on CoinGecko (<code>{}</code>): <strong>{}</strong></p>\n",
            escape_html(&primary.name),
            escape_html(&result.comparison_coin_id),
            escape_html(&result.comparison_price.to_string())
        );
    }

    body.push_str(
        "<table>\n<thead><tr><th>Rank</th><th>Name</th><th>Symbol</th>\
         <th>Price (USD)</th><th>Market cap</th><th>24h</th></tr></thead>\n<tbody>\n",
    );
    for listing in &result.listings.data {
        listing_row(&mut body, listing);
    }
    body.push_str("</tbody>\n</table>\n");

    let status = &result.listings.status;
    let _ = write!(
        body,
        "<p><small>Data as of {} ({} ms, {} credits)</small></p>\n",
        status.timestamp.to_rfc3339(),
        status.elapsed,
        status.credit_count
    );
    body.push_str(&query_form());

    page("Crypto listings", &body)
}
