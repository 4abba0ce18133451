use crate::error::RenderError;
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::NaiveDateTime;
use engine_config::settings::layout::{FieldFormat, FieldSettings, Justify, SignStyle};
use engine_core::state::models::TotalsSnapshot;
use model::core::value::Value;

/// A fixed-width text line under construction. Every rendered line is
/// exactly `width` characters long.
#[derive(Debug, Clone)]
pub struct FixedWidthLine {
    cells: Vec<char>,
}

impl FixedWidthLine {
    pub fn new(width: usize) -> Self {
        Self {
            cells: vec![' '; width],
        }
    }

    /// A line holding a single left-justified text, truncated to the width.
    pub fn text(width: usize, text: &str) -> String {
        let mut line = Self::new(width);
        line.put_text(0, width, text, Justify::Left);
        line.render()
    }

    /// Places `text` into the column range, truncating over-length text.
    /// Parts of the range beyond the line width are dropped.
    pub fn put_text(&mut self, column: usize, width: usize, text: &str, justify: Justify) {
        let fitted = fit(text, width, justify);
        for (offset, ch) in fitted.chars().enumerate() {
            if let Some(cell) = self.cells.get_mut(column + offset) {
                *cell = ch;
            }
        }
    }

    pub fn put_field(&mut self, field: &FieldSettings, value: &Value) -> Result<(), RenderError> {
        let text = format_value(field, value)?;
        self.put_text(field.column, field.width, &text, field.justify);
        Ok(())
    }

    pub fn render(self) -> String {
        self.cells.into_iter().collect()
    }
}

/// Pads or truncates `text` to exactly `width` characters.
pub fn fit(text: &str, width: usize, justify: Justify) -> String {
    let truncated: String = text.chars().take(width).collect();
    match justify {
        Justify::Left => format!("{truncated:<width$}"),
        Justify::Right => format!("{truncated:>width$}"),
    }
}

/// Formats a value for a field without justification. Numeric output that
/// does not fit the field is an error; text is truncated later.
pub fn format_value(field: &FieldSettings, value: &Value) -> Result<String, RenderError> {
    if value.is_null() {
        return Ok(String::new());
    }

    let text = match &field.format {
        FieldFormat::Text => value.to_string(),
        FieldFormat::Date { pattern } => match value {
            Value::Date(d) => d.format(pattern).to_string(),
            other => other.to_string(),
        },
        FieldFormat::Number { zero_pad } => {
            let number = numeric(field, value)?;
            let text = format_amount(&number, 0, SignStyle::Leading, false, None);
            if !*zero_pad {
                text
            } else if let Some(digits) = text.strip_prefix('-') {
                format!("-{digits:0>width$}", width = field.width.saturating_sub(1))
            } else {
                format!("{text:0>width$}", width = field.width)
            }
        }
        FieldFormat::Amount {
            decimals,
            sign,
            thousands,
            currency,
        } => {
            let amount = numeric(field, value)?;
            format_amount(&amount, *decimals, *sign, *thousands, *currency)
        }
    };

    if field.format.is_numeric() && text.chars().count() > field.width {
        return Err(RenderError::NumericOverflow {
            field: field.name.clone(),
            value: value.to_string(),
            width: field.width,
        });
    }
    Ok(text)
}

fn numeric(field: &FieldSettings, value: &Value) -> Result<BigDecimal, RenderError> {
    value.as_decimal().ok_or_else(|| RenderError::InvalidValue {
        field: field.name.clone(),
        value: value.to_string(),
        message: format!("expected a number, found {}", value.data_type()),
    })
}

/// Renders a decimal with a fixed number of decimals (half-up), optional
/// thousands separators, the given sign convention and an optional
/// leading currency symbol.
pub fn format_amount(
    amount: &BigDecimal,
    decimals: u32,
    sign: SignStyle,
    thousands: bool,
    currency: Option<char>,
) -> String {
    let rounded = amount
        .abs()
        .with_scale_round(i64::from(decimals), RoundingMode::HalfUp);
    let negative = *amount < BigDecimal::zero() && !rounded.is_zero();

    let (digits, _) = rounded.as_bigint_and_exponent();
    let digits = format!("{:0>width$}", digits.to_string(), width = decimals as usize + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - decimals as usize);

    let mut body = if thousands {
        group_thousands(int_part)
    } else {
        int_part.to_string()
    };
    if decimals > 0 {
        body.push('.');
        body.push_str(frac_part);
    }

    let mut out = String::with_capacity(body.len() + 3);
    if negative && sign == SignStyle::Leading {
        out.push('-');
    }
    if let Some(symbol) = currency {
        out.push(symbol);
    }
    out.push_str(&body);
    match sign {
        SignStyle::Leading => {}
        SignStyle::Trailing => out.push(if negative { '-' } else { ' ' }),
        SignStyle::Cr => out.push_str(if negative { "CR" } else { "  " }),
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Column layout shared by subtotal and grand-total lines: a label, the
/// record count, and the amount printed under the detail amount column.
#[derive(Debug, Clone)]
pub struct TotalsLayout {
    pub line_width: usize,
    pub label_width: usize,
    pub count_width: usize,
    pub amount: FieldSettings,
}

impl TotalsLayout {
    pub fn render(
        &self,
        label: &str,
        totals: &TotalsSnapshot,
        debit_credit: bool,
    ) -> Result<Vec<String>, RenderError> {
        let mut lines = Vec::with_capacity(3);

        let mut line = FixedWidthLine::new(self.line_width);
        line.put_text(0, self.label_width, label, Justify::Left);
        let count = totals.count.to_string();
        if count.len() > self.count_width {
            return Err(RenderError::NumericOverflow {
                field: "count".into(),
                value: count,
                width: self.count_width,
            });
        }
        line.put_text(self.label_width + 1, self.count_width, &count, Justify::Right);
        line.put_field(&self.amount, &Value::Decimal(totals.total.clone()))?;
        lines.push(line.render());

        if debit_credit {
            for (caption, amount) in [("  DEBITS", &totals.debit), ("  CREDITS", &totals.credit)] {
                let mut line = FixedWidthLine::new(self.line_width);
                line.put_text(0, self.label_width, caption, Justify::Left);
                line.put_field(&self.amount, &Value::Decimal(amount.clone()))?;
                lines.push(line.render());
            }
        }
        Ok(lines)
    }
}

/// The four-line block printed at the top of every page: job and title
/// with the page number, run date and time, column captions, and a rule.
#[derive(Debug, Clone)]
pub struct PageHeader {
    pub job_id: String,
    pub title: String,
    pub line_width: usize,
    pub columns: Vec<FieldSettings>,
}

impl PageHeader {
    pub fn render(&self, page: u32, run_at: NaiveDateTime) -> Vec<String> {
        let width = self.line_width;

        let mut first = FixedWidthLine::new(width);
        let title_start = width.saturating_sub(self.title.chars().count()) / 2;
        first.put_text(title_start, width - title_start, &self.title, Justify::Left);
        first.put_text(0, self.job_id.chars().count(), &self.job_id, Justify::Left);
        let page_label = format!("PAGE {page:>5}");
        first.put_text(
            width.saturating_sub(page_label.len()),
            page_label.len(),
            &page_label,
            Justify::Right,
        );

        let mut second = FixedWidthLine::new(width);
        let run_date = format!("RUN DATE: {}", run_at.format("%m/%d/%Y"));
        let run_time = format!("RUN TIME: {}", run_at.format("%H:%M:%S"));
        second.put_text(0, run_date.len(), &run_date, Justify::Left);
        second.put_text(
            width.saturating_sub(run_time.len()),
            run_time.len(),
            &run_time,
            Justify::Right,
        );

        let mut captions = FixedWidthLine::new(width);
        for column in &self.columns {
            let caption = column
                .caption
                .clone()
                .unwrap_or_else(|| column.name.to_uppercase());
            captions.put_text(column.column, column.width, &caption, column.justify);
        }

        vec![
            first.render(),
            second.render(),
            captions.render(),
            "-".repeat(width),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn amount_field(width: usize, sign: SignStyle) -> FieldSettings {
        FieldSettings::new("amount", 0, width)
            .with_justify(Justify::Right)
            .with_format(FieldFormat::Amount {
                decimals: 2,
                sign,
                thousands: true,
                currency: None,
            })
    }

    #[test]
    fn formats_amounts_with_sign_styles() {
        let v = dec("-1234567.891");
        assert_eq!(format_amount(&v, 2, SignStyle::Leading, true, None), "-1,234,567.89");
        assert_eq!(format_amount(&v, 2, SignStyle::Trailing, true, None), "1,234,567.89-");
        assert_eq!(format_amount(&v, 2, SignStyle::Cr, false, Some('$')), "$1234567.89CR");
        assert_eq!(format_amount(&dec("5"), 2, SignStyle::Cr, true, None), "5.00  ");
        assert_eq!(format_amount(&dec("0.005"), 2, SignStyle::Leading, true, None), "0.01");
        assert_eq!(format_amount(&dec("-0.004"), 2, SignStyle::Leading, true, None), "0.00");
        assert_eq!(format_amount(&dec("999.5"), 0, SignStyle::Leading, true, None), "1,000");
    }

    #[test]
    fn right_justifies_amounts() {
        let mut line = FixedWidthLine::new(12);
        line.put_field(&amount_field(12, SignStyle::Leading), &Value::Decimal(dec("180")))
            .unwrap();
        assert_eq!(line.render(), "      180.00");
    }

    #[test]
    fn numeric_overflow_is_an_error() {
        let err = format_value(&amount_field(6, SignStyle::Leading), &Value::Decimal(dec("1234.5")))
            .unwrap_err();
        assert!(matches!(err, RenderError::NumericOverflow { width: 6, .. }));
    }

    #[test]
    fn text_is_truncated_not_rejected() {
        let field = FieldSettings::new("vendor", 2, 5);
        let mut line = FixedWidthLine::new(10);
        line.put_field(&field, &Value::from("ACME SUPPLY")).unwrap();
        assert_eq!(line.render(), "  ACME    ");
    }

    #[test]
    fn zero_pads_numbers() {
        let field = FieldSettings::new("control_nbr", 0, 6)
            .with_format(FieldFormat::Number { zero_pad: true });
        assert_eq!(format_value(&field, &Value::Int(42)).unwrap(), "000042");
        assert_eq!(format_value(&field, &Value::Int(-42)).unwrap(), "-00042");
    }

    #[test]
    fn dates_use_the_configured_pattern() {
        let field = FieldSettings::new("paid_on", 0, 10).with_format(FieldFormat::Date {
            pattern: "%m/%d/%Y".into(),
        });
        let value = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(format_value(&field, &value).unwrap(), "03/31/2024");
    }

    #[test]
    fn amount_format_rejects_text() {
        let err = format_value(&amount_field(10, SignStyle::Leading), &Value::from("N/A"))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidValue { .. }));
    }

    #[test]
    fn totals_line_places_count_and_amount() {
        let layout = TotalsLayout {
            line_width: 40,
            label_width: 20,
            count_width: 5,
            amount: FieldSettings::new("amount", 28, 12)
                .with_justify(Justify::Right)
                .with_format(FieldFormat::amount()),
        };
        let totals = TotalsSnapshot {
            count: 3,
            total: dec("180.00"),
            debit: dec("180.00"),
            credit: dec("0"),
        };
        let lines = layout.render("TOTAL PER", &totals, true).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("{:<20} {:>5}  {:>12}", "TOTAL PER", 3, "180.00"));
        assert!(lines[2].starts_with("  CREDITS"));
        assert!(lines[2].ends_with("0.00"));
        assert!(lines.iter().all(|l| l.len() == 40));
    }

    #[test]
    fn header_has_four_full_width_lines() {
        let header = PageHeader {
            job_id: "P09305".into(),
            title: "REFUND REGISTER".into(),
            line_width: 60,
            columns: vec![FieldSettings::new("refund_type", 0, 4).with_caption("TYPE")],
        };
        let run_at = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        let lines = header.render(2, run_at);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.chars().count() == 60));
        assert!(lines[0].starts_with("P09305"));
        assert!(lines[0].ends_with("PAGE     2"));
        assert!(lines[0].contains("REFUND REGISTER"));
        assert!(lines[1].starts_with("RUN DATE: 03/31/2024"));
        assert!(lines[1].ends_with("RUN TIME: 14:05:09"));
        assert!(lines[2].starts_with("TYPE"));
        assert_eq!(lines[3], "-".repeat(60));
    }
}
