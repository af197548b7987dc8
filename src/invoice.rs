//! Sponsor invoices: amount calculation and the printable page.

use chrono::{Datelike, NaiveDate};

use crate::alerts::parse_day;
use crate::html::{self, escape};

const CPM_FINAL_AFTER_DAYS: i64 = 30;

/// Sponsor fields an invoice is computed from.
#[derive(Debug, Clone, Default)]
pub struct InvoiceSource {
    pub id: i64,
    pub brand_name: String,
    pub deal_type: String,
    pub deal_value_gross: f64,
    pub cpm_rate: Option<f64>,
    pub cpm_cap: Option<f64>,
    pub views_at_30_days: i64,
    pub live_date: Option<String>,
    pub invoice_date: Option<String>,
    pub payment_due_date: Option<String>,
    pub invoice_amount: f64,
    pub agency_contact: String,
    pub contact_name: String,
    pub contact_email: String,
    pub youtube_video_id: String,
    pub youtube_video_title: String,
    pub payment_terms_brand_days: i64,
    pub payment_terms_agency_days: i64,
    pub notes: String,
    pub promo_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub detail: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub number: String,
    pub lines: Vec<LineItem>,
    pub subtotal: f64,
    pub total: f64,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub billed_to: String,
}

#[derive(Debug, Clone)]
pub struct Issuer {
    pub name: String,
    pub email: String,
}

pub fn cpm_earnings(views: i64, rate: f64, cap: f64) -> f64 {
    let raw = views as f64 / 1000.0 * rate;
    if cap > 0.0 {
        raw.min(cap)
    } else {
        raw
    }
}

pub fn compute(s: &InvoiceSource, today: NaiveDate) -> Invoice {
    let mut lines = Vec::new();

    if s.deal_type == "cpm" {
        let rate = s.cpm_rate.unwrap_or(0.0);
        let cap = s.cpm_cap.unwrap_or(0.0);
        let views = s.views_at_30_days;
        let days = parse_day(s.live_date.as_deref()).map(|live| (today - live).num_days());

        if views > 0 && rate > 0.0 {
            let earned = cpm_earnings(views, rate, cap);
            let hit_cap = cap > 0.0 && earned >= cap;
            let status = match days {
                Some(d) if d >= CPM_FINAL_AFTER_DAYS => "Final (30-day window closed)".to_string(),
                Some(d) => format!("Provisional — {} views at day {}", html::thousands(views), d),
                None => format!("Provisional — {} views at day ?", html::thousands(views)),
            };
            lines.push(LineItem {
                description: format!(
                    "CPM Sponsorship: {} views × ${}/1,000 = ${}{}",
                    html::thousands(views),
                    rate,
                    html::money(earned),
                    if hit_cap { " (cap reached)" } else { "" }
                ),
                detail: Some(status),
                amount: earned,
            });
        } else if s.invoice_amount > 0.0 {
            lines.push(LineItem {
                description: "CPM Sponsorship (amount per agreement)".into(),
                detail: None,
                amount: s.invoice_amount,
            });
        }
    } else {
        let amount = if s.deal_value_gross > 0.0 {
            s.deal_value_gross
        } else {
            s.invoice_amount
        };
        lines.push(LineItem {
            description: "YouTube Sponsorship Integration (flat fee)".into(),
            detail: None,
            amount,
        });
    }

    let subtotal: f64 = lines.iter().map(|l| l.amount).sum();
    let total = if s.invoice_amount > 0.0 {
        s.invoice_amount
    } else {
        subtotal
    };
    let billed_to = [&s.agency_contact, &s.contact_name, &s.brand_name]
        .into_iter()
        .find(|v| !v.trim().is_empty())
        .cloned()
        .unwrap_or_default();

    Invoice {
        number: format!("SPO-{}-{:04}", today.year(), s.id),
        lines,
        subtotal,
        total,
        issue_date: parse_day(s.invoice_date.as_deref()).unwrap_or(today),
        due_date: parse_day(s.payment_due_date.as_deref()),
        billed_to,
    }
}

const STYLE: &str = "
*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  font-size: 14px; color: #1a1a1a; background: #f5f5f5; padding: 40px 20px; }
.page { max-width: 760px; margin: 0 auto; background: #fff; border-radius: 12px;
  box-shadow: 0 4px 32px rgba(0,0,0,0.10); padding: 56px 60px; }
.header { display: flex; justify-content: space-between; margin-bottom: 48px;
  padding-bottom: 32px; border-bottom: 2px solid #eee; }
.from-name { font-size: 22px; font-weight: 700; }
.sub { font-size: 13px; color: #666; margin-top: 4px; }
.meta { text-align: right; }
.label { font-size: 11px; color: #999; text-transform: uppercase; letter-spacing: 0.08em; margin-bottom: 4px; }
.num { font-size: 20px; font-weight: 700; }
.parties { display: grid; grid-template-columns: 1fr 1fr; gap: 32px; margin-bottom: 40px; }
.party-name { font-size: 15px; font-weight: 600; }
.video-ref { background: #f8f8f8; border-radius: 8px; padding: 14px 18px; margin-bottom: 32px; font-size: 13px; }
.video-ref a { color: #5a67d8; text-decoration: none; font-size: 12px; }
table { width: 100%; border-collapse: collapse; }
thead th { font-size: 11px; text-transform: uppercase; color: #999; padding: 0 0 10px; text-align: left; }
thead th:last-child, tbody td:last-child { text-align: right; }
tbody td { padding: 16px 0; font-size: 13px; border-bottom: 1px solid #f0f0f0; vertical-align: top; }
tbody td:last-child { font-weight: 600; white-space: nowrap; }
tbody td small { font-size: 11px; color: #888; }
.totals { padding-top: 16px; border-top: 2px solid #eee; }
.total-row { display: flex; justify-content: space-between; padding: 6px 0; font-size: 13px; color: #555; }
.total-row.grand { font-size: 18px; font-weight: 700; color: #111; border-top: 1px solid #eee; padding-top: 12px; }
.terms { margin-top: 40px; padding-top: 24px; border-top: 1px solid #eee; font-size: 12px; color: #888; line-height: 1.6; }
.footer { margin-top: 48px; text-align: center; font-size: 11px; color: #bbb; }
.print-btn { position: fixed; top: 24px; right: 24px; padding: 10px 22px; background: #111; color: #fff;
  border: none; border-radius: 8px; cursor: pointer; }
@media print { body { background: #fff; padding: 0; } .page { box-shadow: none; } .print-btn { display: none; } }
";

pub fn render(s: &InvoiceSource, inv: &Invoice, issuer: &Issuer, today: NaiveDate) -> String {
    let mut body = String::new();
    body.push_str("<button class=\"print-btn\" onclick=\"window.print()\">Print / Save PDF</button>\n");
    body.push_str("<div class=\"page\">\n");

    let issuer_email = if issuer.email.is_empty() {
        String::new()
    } else {
        format!("<div class=\"sub\">{}</div>", escape(&issuer.email))
    };
    let due = inv
        .due_date
        .map(html::long_date)
        .unwrap_or_else(|| "30 days from issue".to_string());
    body.push_str(&format!(
        "<div class=\"header\"><div><div class=\"from-name\">{name}</div>{email}</div>\
         <div class=\"meta\"><div class=\"label\">Invoice</div><div class=\"num\">{num}</div>\
         <div class=\"sub\"><strong>Issued:</strong> {issued}</div>\
         <div class=\"sub\"><strong>Due:</strong> {due}</div></div></div>\n",
        name = escape(&issuer.name),
        email = issuer_email,
        num = escape(&inv.number),
        issued = html::long_date(inv.issue_date),
        due = escape(&due),
    ));

    let billed_email = if s.contact_email.is_empty() {
        String::new()
    } else {
        format!("<div class=\"sub\">{}</div>", escape(&s.contact_email))
    };
    body.push_str(&format!(
        "<div class=\"parties\"><div><div class=\"label\">Bill To</div>\
         <div class=\"party-name\">{to}</div>{email}<div class=\"sub\">{brand}</div></div>\
         <div><div class=\"label\">From</div><div class=\"party-name\">{from}</div>{from_email}</div></div>\n",
        to = escape(&inv.billed_to),
        email = billed_email,
        brand = escape(&s.brand_name),
        from = escape(&issuer.name),
        from_email = issuer_email,
    ));

    let video_url = (!s.youtube_video_id.is_empty())
        .then(|| format!("https://youtube.com/watch?v={}", s.youtube_video_id));
    if video_url.is_some() || !s.youtube_video_title.is_empty() {
        let title = if s.youtube_video_title.is_empty() {
            "YouTube Sponsorship Integration"
        } else {
            s.youtube_video_title.as_str()
        };
        let link = video_url
            .map(|u| format!("<a href=\"{0}\" target=\"_blank\">{0}</a>", escape(&u)))
            .unwrap_or_default();
        body.push_str(&format!(
            "<div class=\"video-ref\"><div><strong>{}</strong></div>{}</div>\n",
            escape(title),
            link
        ));
    }

    body.push_str(
        "<table><thead><tr><th>Description</th><th>Amount (USD)</th></tr></thead><tbody>\n",
    );
    for line in &inv.lines {
        let detail = line
            .detail
            .as_deref()
            .map(|d| format!("<br><small>{}</small>", escape(d)))
            .unwrap_or_default();
        body.push_str(&format!(
            "<tr><td>{}{}</td><td>${}</td></tr>\n",
            escape(&line.description),
            detail,
            html::money(line.amount)
        ));
    }
    body.push_str("</tbody></table>\n<div class=\"totals\">\n");
    if inv.lines.len() > 1 {
        body.push_str(&format!(
            "<div class=\"total-row\"><span>Subtotal</span><span>${}</span></div>\n",
            html::money(inv.subtotal)
        ));
    }
    body.push_str(&format!(
        "<div class=\"total-row grand\"><span>Total Due</span><span>${}</span></div>\n</div>\n",
        html::money(inv.total)
    ));

    body.push_str("<div class=\"terms\"><strong>Payment Terms:</strong> ");
    if s.payment_terms_brand_days > 0 {
        body.push_str(&format!(
            "Brand pays agency within {} days of publish. ",
            s.payment_terms_brand_days
        ));
    }
    if s.payment_terms_agency_days > 0 {
        body.push_str(&format!(
            "Agency pays creator within {} days thereafter.",
            s.payment_terms_agency_days
        ));
    }
    if !s.promo_code.is_empty() {
        body.push_str(&format!(
            "<br><strong>Promo Code:</strong> {}",
            escape(&s.promo_code)
        ));
    }
    if !s.notes.is_empty() {
        body.push_str(&format!("<br><strong>Notes:</strong> {}", escape(&s.notes)));
    }
    body.push_str("</div>\n");
    body.push_str(&format!(
        "<div class=\"footer\">Generated by Production Hub · {}</div>\n</div>",
        html::long_date(today)
    ));

    html::document(&format!("Invoice {}", inv.number), STYLE, &body)
}
