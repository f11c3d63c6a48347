//! Format settings and the text-layout helpers shared by all renderers.

use log::warn;
use rivet::block::Options;

/// Command-scoped output options. Updated by `format` blocks and block
/// parameters; later blocks inherit the current values.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSettings {
    /// Decimals used in substituted equation forms (`e`).
    pub equation_decimals: usize,
    /// Decimals used for results and values (`r`).
    pub result_decimals: usize,
    /// 0: result only, 1: add symbolic form, 2: add substituted form (`p`).
    pub print_mode: u8,
    /// Remove trailing zeros (`t`).
    pub trim: bool,
    /// Number equations (`n`).
    pub numbering: bool,
    /// Wrap width for inserted text files.
    pub text_width: usize,
    /// Maximum cell width for grid tables.
    pub table_width: usize,
    /// Image scale in percent.
    pub scale: u32,
}

impl Default for FormatSettings {
    fn default() -> Self {
        FormatSettings {
            equation_decimals: 3,
            result_decimals: 3,
            print_mode: 2,
            trim: false,
            numbering: true,
            text_width: 65,
            table_width: 30,
            scale: 100,
        }
    }
}

/// Largest accepted `e`/`r` value.
pub const MAX_DECIMALS: usize = 15;

impl FormatSettings {
    /// Apply `e:N, r:N, p:N, t:t/f, n:t/f`. Malformed values keep the
    /// current setting.
    pub fn apply_options(&mut self, options: &Options) {
        let decimals = |v: &str| v.parse().ok().filter(|d: &usize| *d <= MAX_DECIMALS);
        update(options, "e", &mut self.equation_decimals, decimals);
        update(options, "r", &mut self.result_decimals, decimals);
        update(options, "p", &mut self.print_mode, |v| {
            v.parse().ok().filter(|p: &u8| *p <= 2)
        });
        update(options, "t", &mut self.trim, |_| options.flag("t"));
        update(options, "n", &mut self.numbering, |_| options.flag("n"));
    }
}

fn update<T>(options: &Options, key: &str, slot: &mut T, parse: impl Fn(&str) -> Option<T>) {
    let Some(raw) = options.get(key) else { return };
    match parse(raw) {
        Some(value) => *slot = value,
        None => warn!("ignoring malformed format option {}:{}", key, raw),
    }
}

/// Parse an optional numeric block parameter, falling back to `default`.
pub fn number_or<T: std::str::FromStr + Copy>(param: Option<&str>, default: T) -> T {
    match param {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring malformed numeric parameter '{}'", raw);
            default
        }),
    }
}

/// Fixed-decimal rendering with thousands separators (`12,345.679`).
pub fn format_number(value: f64, decimals: usize, trim: bool) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = grouped;
    if let Some(frac) = frac_part {
        let frac = if trim { frac.trim_end_matches('0') } else { frac };
        if !frac.is_empty() {
            out.push('.');
            out.push_str(frac);
        }
    }

    let is_zero = out.chars().all(|c| c == '0' || c == ',' || c == '.');
    if value < 0.0 && !is_zero {
        out.insert(0, '-');
    }
    out
}

/// Display width in characters.
pub fn width(text: &str) -> usize {
    text.chars().count()
}

pub fn rjust(text: &str, total: usize) -> String {
    let w = width(text);
    if w >= total {
        text.to_string()
    } else {
        format!("{}{}", " ".repeat(total - w), text)
    }
}

pub fn ljust(text: &str, total: usize) -> String {
    let w = width(text);
    if w >= total {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(total - w))
    }
}

pub fn center(text: &str, total: usize) -> String {
    let w = width(text);
    if w >= total {
        return text.to_string();
    }
    let left = (total - w) / 2;
    format!("{}{}", " ".repeat(left), text)
}

/// Greedy word wrap. Words longer than `max` are split.
pub fn wrap(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.len()
        } else {
            width(&current) + 1 + word.len()
        };
        if needed > max && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// The equation rule `└────┘` spanning `total` columns.
pub fn rule(total: usize) -> String {
    format!("└{}┘", "─".repeat(total.saturating_sub(2)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_decimals_keep_the_current_setting() {
        let mut settings = FormatSettings::default();
        settings.apply_options(&Options::parse("e:1000000000, r:15"));
        assert_eq!(settings.equation_decimals, 3);
        assert_eq!(settings.result_decimals, 15);
        settings.apply_options(&Options::parse("r:16"));
        assert_eq!(settings.result_decimals, 15);
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_number(12345.6789, 3, false), "12,345.679");
        assert_eq!(format_number(-1234567.0, 0, false), "-1,234,567");
        assert_eq!(format_number(999.9996, 3, false), "1,000.000");
        assert_eq!(format_number(10.1, 3, false), "10.100");
    }

    #[test]
    fn trimming_drops_trailing_zeros() {
        assert_eq!(format_number(10.1, 3, true), "10.1");
        assert_eq!(format_number(4.0, 3, true), "4");
    }

    #[test]
    fn negative_zero_has_no_sign() {
        assert_eq!(format_number(-0.0001, 2, false), "0.00");
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| width(l) <= 10));
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 4), vec![""]);
    }

    #[test]
    fn justification() {
        assert_eq!(rjust("ab", 5), "   ab");
        assert_eq!(center("ab", 6), "  ab");
        assert_eq!(rule(5), "└───┘");
    }

    #[test]
    fn malformed_options_keep_defaults() {
        let mut settings = FormatSettings::default();
        settings.apply_options(&Options::parse("e:x, r:4, p:9, t:t"));
        assert_eq!(settings.equation_decimals, 3);
        assert_eq!(settings.result_decimals, 4);
        assert_eq!(settings.print_mode, 2);
        assert!(settings.trim);
    }
}
