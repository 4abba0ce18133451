use serde::{Deserialize, Serialize};

/// Horizontal placement of a value inside its field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    #[default]
    Left,
    Right,
}

/// How a negative amount is marked.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignStyle {
    /// `-1,234.50`
    #[default]
    Leading,
    /// `1,234.50-` (positive values get a trailing blank)
    Trailing,
    /// `1,234.50CR` (positive values get two trailing blanks)
    Cr,
}

/// Rendering rule for one field of a fixed-width line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldFormat {
    /// Plain text, truncated to the field width.
    #[default]
    Text,

    /// Monetary amount with a fixed number of decimals. Overflow is an error.
    Amount {
        #[serde(default = "default_decimals")]
        decimals: u32,
        #[serde(default)]
        sign: SignStyle,
        #[serde(default = "default_true")]
        thousands: bool,
        #[serde(default)]
        currency: Option<char>,
    },

    /// Whole number, optionally zero padded. Overflow is an error.
    Number {
        #[serde(default)]
        zero_pad: bool,
    },

    /// Date rendered with a chrono format pattern.
    Date {
        #[serde(default = "default_date_pattern")]
        pattern: String,
    },
}

impl FieldFormat {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldFormat::Amount { .. } | FieldFormat::Number { .. })
    }

    /// Default amount mask: two decimals, leading sign, thousands separators.
    pub fn amount() -> Self {
        FieldFormat::Amount {
            decimals: default_decimals(),
            sign: SignStyle::Leading,
            thousands: true,
            currency: None,
        }
    }
}

/// One column range of a fixed-width line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSettings {
    pub name: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Zero-based starting column.
    pub column: usize,
    pub width: usize,
    #[serde(default)]
    pub justify: Justify,
    #[serde(default)]
    pub format: FieldFormat,
}

impl FieldSettings {
    pub fn new(name: impl Into<String>, column: usize, width: usize) -> Self {
        Self {
            name: name.into(),
            caption: None,
            column,
            width,
            justify: Justify::Left,
            format: FieldFormat::Text,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = format;
        self
    }

    /// Exclusive end column.
    pub fn end(&self) -> usize {
        self.column + self.width
    }

    pub fn overlaps(&self, other: &FieldSettings) -> bool {
        self.column < other.end() && other.column < self.end()
    }
}

/// Column widths of subtotal and grand-total lines. The amount itself is
/// printed under the detail amount column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalsSettings {
    #[serde(default = "default_label_width")]
    pub label_width: usize,
    #[serde(default = "default_count_width")]
    pub count_width: usize,
}

impl Default for TotalsSettings {
    fn default() -> Self {
        Self {
            label_width: default_label_width(),
            count_width: default_count_width(),
        }
    }
}

fn default_decimals() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_date_pattern() -> String {
    "%m/%d/%Y".to_string()
}

fn default_label_width() -> usize {
    30
}

fn default_count_width() -> usize {
    7
}
