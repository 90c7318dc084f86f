use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::{table, RenderOptions};

/// Human-readable report for a command's JSON envelope. Result shapes the
/// report does not know fall back to the table layout.
pub fn render_report(value: &Value, options: RenderOptions) -> String {
    let result = value.get("result").unwrap_or(value);
    let mut r = Report::default();

    if result.get("tax").is_some() && result.get("annual_by_account").is_some() {
        estimate_report(&mut r, value, result, options);
    } else if result.get("total_federal_tax").is_some() {
        r.title("Federal Tax Estimate");
        tax_section(&mut r, result);
        if options.breakdown {
            breakdown_section(&mut r, result.get("breakdown"));
        }
    } else if result.get("overall_beta").is_some() {
        beta_report(&mut r, result);
    } else if result.get("ordinary_brackets").is_some() {
        params_report(&mut r, result);
    } else {
        return table::render_table(value);
    }

    warnings_section(&mut r, value);
    r.finish()
}

#[derive(Default)]
struct Report {
    lines: Vec<String>,
}

impl Report {
    fn title(&mut self, text: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("=== {} ===", text).bold().to_string());
        self.lines.push(String::new());
    }

    fn heading(&mut self, text: &str) {
        self.lines.push(String::new());
        self.lines.push(text.bold().to_string());
    }

    fn row(&mut self, label: &str, value: String) {
        self.lines.push(format!("  {:<34} {:>16}", label, value));
    }

    fn line(&mut self, text: String) {
        self.lines.push(text);
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn estimate_report(r: &mut Report, envelope: &Value, result: &Value, options: RenderOptions) {
    let assumptions = envelope.get("assumptions");
    let year = assumptions
        .and_then(|a| a.get("tax_year"))
        .map(|v| v.to_string())
        .unwrap_or_default();
    let status = assumptions
        .and_then(|a| a.get("filing_status"))
        .and_then(Value::as_str)
        .unwrap_or("single");
    r.title(&format!("Withdrawal & Federal Tax Estimate ({}, {})", year, status));

    r.heading("Annual income by account");
    for account in ["deferred", "brokerage", "roth"] {
        r.row(account, money(result.pointer(&format!("/annual_by_account/{account}"))));
    }

    r.heading("Withdrawals");
    r.row("Total annual withdrawal", money(result.get("total_annual_withdrawal")));
    r.row("Total monthly withdrawal", money(result.get("total_monthly_withdrawal")));
    if let Some(ltcg) = decimal(result.get("additional_ltcg")).filter(|d| !d.is_zero()) {
        r.row("  incl. additional LTCG", fmt_money(ltcg));
    }
    r.row("Social Security (annual)", money(result.get("ss_annual")));

    r.heading("Taxable income buckets");
    r.row("Deferred (ordinary)", money(result.pointer("/buckets/deferred_ordinary")));
    r.row("Brokerage ordinary / interest", money(result.pointer("/buckets/brokerage_ordinary")));
    r.row("Brokerage qualified dividends", money(result.pointer("/buckets/brokerage_qualified")));
    r.row("Brokerage capital gains", money(result.pointer("/buckets/brokerage_capital_gains")));
    r.row("Roth (tax-free)", money(result.pointer("/buckets/roth_taxfree")));

    let tax = result.get("tax").unwrap_or(&Value::Null);
    tax_section(r, tax);

    r.heading("After tax");
    r.row("Annual income", money(result.get("after_tax_annual_income")));
    r.row("Monthly income", money(result.get("after_tax_monthly_income")));

    if options.breakdown {
        holdings_section(r, result.get("holdings"));
        breakdown_section(r, tax.get("breakdown"));
    }
}

fn tax_section(r: &mut Report, tax: &Value) {
    r.heading("Federal tax");
    if decimal(tax.get("ss_annual")).is_some_and(|d| !d.is_zero()) {
        r.row("Provisional income", money(tax.get("provisional_income")));
        r.row("Taxable Social Security", money(tax.get("taxable_social_security")));
    }
    r.row("Ordinary taxable income", money(tax.get("ordinary_taxable_income")));
    r.row("Standard deduction used", money(tax.get("standard_deduction_used")));
    r.row("Ordinary income after deduction", money(tax.get("ordinary_after_deduction")));
    r.row("Ordinary tax", money(tax.get("ordinary_tax")));
    r.row("Qualified dividend tax", money(tax.get("qualified_dividend_tax")));
    r.row("Capital gains tax", money(tax.get("capital_gains_tax")));
    r.row(
        "Total federal tax",
        money(tax.get("total_federal_tax")).bold().to_string(),
    );
    r.row("Taxable withdrawals", money(tax.get("taxable_withdrawals")));
    r.row("Effective rate", percent(tax.get("effective_rate")));
}

fn holdings_section(r: &mut Report, holdings: Option<&Value>) {
    let Some(Value::Array(items)) = holdings else {
        return;
    };
    r.heading("Holdings");
    for h in items {
        let text = |key: &str| h.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
        r.line(format!(
            "  {:<8} {:<10} {:>14} @ {:>6} -> {:>12}  {} ({})",
            text("ticker"),
            text("account_type"),
            money(h.get("market_value")),
            percent_points(h.get("yield_pct")),
            money(h.get("annual_income")),
            text("bucket"),
            text("yield_source"),
        ));
    }
}

fn breakdown_section(r: &mut Report, breakdown: Option<&Value>) {
    let Some(breakdown) = breakdown else {
        return;
    };
    r.heading("Band breakdown");
    for (key, label) in [
        ("ordinary", "Ordinary income"),
        ("qualified_dividends", "Qualified dividends"),
        ("capital_gains", "Capital gains"),
    ] {
        let Some(Value::Array(slices)) = breakdown.get(key) else {
            continue;
        };
        if slices.is_empty() {
            continue;
        }
        r.line(format!("  {}", label));
        for s in slices {
            let upper = match s.get("upper") {
                Some(Value::Null) | None => "and up".to_string(),
                other => fmt_money(decimal(other).unwrap_or_default()),
            };
            r.line(format!(
                "    {:>14} - {:<14} at {:>6}: {:>14} -> {:>12}",
                money(s.get("lower")),
                upper,
                percent(s.get("rate")),
                money(s.get("amount")),
                money(s.get("tax")),
            ));
        }
    }
}

fn beta_report(r: &mut Report, result: &Value) {
    r.title("Portfolio Beta");
    if let Some(Value::Array(holdings)) = result.get("holdings") {
        for h in holdings {
            r.line(format!(
                "  {:<8} {:<10} value {:>14}  beta {:>6}",
                h.get("ticker").and_then(Value::as_str).unwrap_or("-"),
                h.get("account_type").and_then(Value::as_str).unwrap_or("-"),
                money(h.get("value")),
                ratio(h.get("beta")),
            ));
        }
    }
    r.heading("Summary");
    r.row("Total value", money(result.get("total_value")));
    r.row("Overall portfolio beta", ratio(result.get("overall_beta")));
    if let Some(Value::Array(accounts)) = result.get("by_account") {
        for a in accounts {
            let name = a.get("account_type").and_then(Value::as_str).unwrap_or("-");
            let beta = match a.get("beta") {
                Some(Value::Null) | None => "no holdings".to_string(),
                b => ratio(b),
            };
            r.row(&format!("  {}", name), beta);
        }
    }
}

fn params_report(r: &mut Report, params: &Value) {
    let year = params.get("tax_year").map(|v| v.to_string()).unwrap_or_default();
    let status = params.get("filing_status").and_then(Value::as_str).unwrap_or("-");
    r.title(&format!("Filing Parameters ({}, {})", year, status));
    r.row("Standard deduction", money(params.get("standard_deduction")));
    r.heading("Ordinary brackets");
    let mut lower = Decimal::ZERO;
    if let Some(Value::Array(brackets)) = params.get("ordinary_brackets") {
        for b in brackets {
            let upper = decimal(b.get("upper"));
            let span = match upper {
                Some(u) => format!("{} - {}", fmt_money(lower), fmt_money(u)),
                None => format!("{} and up", fmt_money(lower)),
            };
            r.row(&span, percent(b.get("rate")));
            lower = upper.unwrap_or(lower);
        }
    }
    r.heading("Preferential bands");
    r.row("0% up to", money(params.get("cg_0pct_limit")));
    r.row("15% up to", money(params.get("cg_15pct_limit")));
    r.row("20% above", String::new());
}

fn warnings_section(r: &mut Report, envelope: &Value) {
    let Some(Value::Array(warnings)) = envelope.get("warnings") else {
        return;
    };
    if warnings.is_empty() {
        return;
    }
    r.heading("Notes");
    for w in warnings.iter().filter_map(Value::as_str) {
        r.line(format!("  - {}", w).yellow().to_string());
    }
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

fn decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn money(value: Option<&Value>) -> String {
    decimal(value).map(fmt_money).unwrap_or_else(|| "-".to_string())
}

/// Rate stored as a fraction, shown as a percentage.
fn percent(value: Option<&Value>) -> String {
    decimal(value)
        .map(|d| format!("{:.2}%", d * Decimal::ONE_HUNDRED))
        .unwrap_or_else(|| "-".to_string())
}

/// Value already in percentage points.
fn percent_points(value: Option<&Value>) -> String {
    decimal(value)
        .map(|d| format!("{:.2}%", d))
        .unwrap_or_else(|| "-".to_string())
}

fn ratio(value: Option<&Value>) -> String {
    decimal(value)
        .map(|d| format!("{:.3}", d))
        .unwrap_or_else(|| "-".to_string())
}

/// `$1,234.56`, rounded to cents.
pub fn fmt_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_money_formatting() {
        assert_eq!(fmt_money(dec!(0)), "$0.00");
        assert_eq!(fmt_money(dec!(999.999)), "$1,000.00");
        assert_eq!(fmt_money(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(fmt_money(dec!(-38146)), "-$38,146.00");
        assert_eq!(fmt_money(dec!(123)), "$123.00");
    }

    #[test]
    fn test_percent_formats_fraction() {
        assert_eq!(percent(Some(&json!("0.0639"))), "6.39%");
        assert_eq!(percent(None), "-");
    }

    fn estimate_envelope() -> Value {
        json!({
            "result": {
                "annual_by_account": { "deferred": "30000", "brokerage": "4674", "roth": "972" },
                "buckets": {
                    "deferred_ordinary": "30000", "brokerage_ordinary": "2774",
                    "brokerage_qualified": "1900", "brokerage_capital_gains": "2500",
                    "roth_taxfree": "972"
                },
                "holdings": [],
                "additional_ltcg": "2500",
                "total_annual_withdrawal": "38146",
                "total_monthly_withdrawal": "3178.8333",
                "ss_annual": "18000",
                "tax": {
                    "ss_annual": "18000", "provisional_income": "41774",
                    "taxable_social_security": "11107.90",
                    "ordinary_taxable_income": "43881.90", "standard_deduction_used": "16100",
                    "ordinary_after_deduction": "27781.90", "ordinary_tax": "3085.828",
                    "qualified_dividend_tax": "0", "capital_gains_tax": "0",
                    "preferential_tax": "0", "total_federal_tax": "3085.828",
                    "taxable_withdrawals": "48281.90", "effective_rate": "0.0639",
                    "breakdown": {
                        "ordinary": [
                            { "lower": "0", "upper": "12400", "rate": "0.10", "amount": "12400", "tax": "1240" }
                        ],
                        "qualified_dividends": [],
                        "capital_gains": []
                    }
                },
                "after_tax_annual_income": "53060.172",
                "after_tax_monthly_income": "4421.681"
            },
            "assumptions": { "tax_year": 2026, "filing_status": "single" },
            "warnings": ["Includes 2500 of additional realized long-term capital gains."]
        })
    }

    #[test]
    fn test_estimate_report_sections() {
        colored::control::set_override(false);
        let out = render_report(&estimate_envelope(), RenderOptions::default());
        assert!(out.contains("Withdrawal & Federal Tax Estimate (2026, single)"));
        assert!(out.contains("$38,146.00"));
        assert!(out.contains("$3,085.83"));
        assert!(out.contains("6.39%"));
        assert!(out.contains("$11,107.90"));
        assert!(out.contains("additional realized long-term capital gains"));
        assert!(!out.contains("Band breakdown"));
    }

    #[test]
    fn test_breakdown_only_on_request() {
        colored::control::set_override(false);
        let out = render_report(&estimate_envelope(), RenderOptions { breakdown: true });
        assert!(out.contains("Band breakdown"));
        assert!(out.contains("$12,400.00"));
        assert!(out.contains("10.00%"));
    }

    #[test]
    fn test_beta_report_marks_empty_accounts() {
        colored::control::set_override(false);
        let value = json!({
            "result": {
                "overall_beta": "1.1",
                "total_value": "2000",
                "by_account": [
                    { "account_type": "deferred", "value": "1000", "beta": "1" },
                    { "account_type": "roth", "value": "0", "beta": null }
                ],
                "holdings": []
            },
            "warnings": []
        });
        let out = render_report(&value, RenderOptions::default());
        assert!(out.contains("1.100"));
        assert!(out.contains("no holdings"));
    }
}
