//! Translation between the compact display-format mini-language and OOXML
//! numFmt strings.
//!
//! Compact numeric formats are a one-letter kind code (`n` grouped number,
//! `c` currency, `p` percent, `f` fixed, `d` zero-padded integer, `g`
//! general numeric) followed by an optional decimal-places digit. Date
//! formats are pattern strings (`yyyy-MM-dd H:mm`) with four single-letter
//! shortcuts; they translate per character. Unrecognized characters pass
//! through verbatim in both directions.

/// Currency symbol substituted into currency templates.
const CURRENCY_SYMBOL: &str = "$";

/// Built-in numFmt table (ids 0-49). Ids not listed here are reserved.
pub const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// First id available for custom formats declared in the stylesheet.
pub const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

/// Look up the format code for a built-in numFmt id.
pub fn builtin_code(id: u32) -> Option<&'static str> {
    BUILTIN_NUM_FMTS
        .iter()
        .find(|(fmt_id, _)| *fmt_id == id)
        .map(|(_, code)| *code)
}

/// Look up the built-in id for a format code.
pub fn builtin_id(code: &str) -> Option<u32> {
    BUILTIN_NUM_FMTS
        .iter()
        .find(|(_, fmt_code)| *fmt_code == code)
        .map(|(id, _)| *id)
}

/// Translate a compact format into an OOXML numFmt string.
pub fn to_num_fmt(compact: &str, is_date: bool) -> String {
    if compact.is_empty() {
        return "General".to_string();
    }
    if !is_date {
        if let Some(code) = numeric_to_num_fmt(compact) {
            return code;
        }
    }
    date_to_num_fmt(compact)
}

fn numeric_to_num_fmt(compact: &str) -> Option<String> {
    let mut chars = compact.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();
    if !matches!(kind, 'n' | 'c' | 'p' | 'f' | 'd' | 'g') {
        return None;
    }
    // The remainder must be a decimal-places count (possibly empty).
    if !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let places: usize = if rest.is_empty() {
        if kind == 'd' {
            1
        } else {
            2
        }
    } else {
        rest.parse().ok()?
    };

    let decimals = if kind == 'd' {
        "0".repeat(places.max(1))
    } else if places > 0 {
        format!(".{}", "0".repeat(places))
    } else {
        String::new()
    };

    let template = match kind {
        'n' => "#,##0{0}",
        'c' => "{1}#,##0{0}_);({1}#,##0{0})",
        'p' => "0{0}%",
        'f' => "0{0}",
        'd' => "{0}",
        'g' => "0{0}",
        _ => unreachable!(),
    };
    Some(template.replace("{0}", &decimals).replace("{1}", CURRENCY_SYMBOL))
}

fn date_to_num_fmt(compact: &str) -> String {
    // Single-letter shortcuts for the common round-trip patterns.
    match compact {
        "r" | "R" => return "ddd, dd mmm yyyy hh:mm:ss \"GMT\"".to_string(),
        "u" => return "yyyy-mm-dd hh:mm:ss\"Z\"".to_string(),
        "o" | "O" => return "yyyy-mm-dd\"T\"hh:mm:ss.000".to_string(),
        _ => {}
    }
    // Fiscal-year and quarter markers have no numFmt equivalent.
    if compact.contains("FY") || compact.contains('Q') {
        return "General".to_string();
    }

    let mut out = String::with_capacity(compact.len());
    let tokens = tokenize(compact);
    for token in &tokens {
        match token {
            Token::Run(c, count) => {
                let mapped = match *c {
                    'M' => 'm',
                    'H' => 'h',
                    'f' => '0',
                    other => other,
                };
                if *c == 't' {
                    out.push_str(if *count >= 2 { "AM/PM" } else { "A/P" });
                } else {
                    for _ in 0..*count {
                        out.push(mapped);
                    }
                }
            }
            Token::Literal(text) => out.push_str(text),
        }
    }
    out
}

/// Translate an OOXML numFmt string into compact formats, one per
/// semicolon-separated section. Always returns at least one element;
/// `"General"` and the empty string map to a single empty compact format.
pub fn from_num_fmt(code: &str) -> Vec<String> {
    if code.is_empty() || code == "General" {
        return vec![String::new()];
    }
    let sections = split_sections(code);
    let mut out: Vec<String> = sections.iter().map(|s| section_to_compact(s)).collect();
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Whether a numFmt code formats its value as a date/time.
pub fn is_date_format(code: &str) -> bool {
    if code.is_empty() || code == "General" {
        return false;
    }
    let scrubbed = scrub_section(split_sections(code).first().map(String::as_str).unwrap_or(""));
    scrubbed
        .chars()
        .any(|c| matches!(c, 'h' | 's' | 'm' | 'y' | ':'))
}

fn section_to_compact(section: &str) -> String {
    let scrubbed = scrub_section(section);
    let trimmed = scrubbed.trim();
    if trimmed.is_empty() || trimmed == "General" {
        return String::new();
    }

    let has_currency = section.contains("[$")
        || trimmed.contains(['$', '\u{20AC}', '\u{A3}', '\u{A5}']);
    let is_percent = trimmed.ends_with('%');
    let is_dateish = trimmed
        .chars()
        .any(|c| matches!(c, 'h' | 's' | 'm' | 'y' | ':'));

    if is_dateish && !has_currency {
        return date_code_to_compact(section);
    }

    let body: String = trimmed
        .chars()
        .filter(|c| matches!(c, '0' | '#' | '.' | ','))
        .collect();
    let places = match body.split_once('.') {
        Some((_, frac)) => frac.chars().filter(|c| *c == '0').count(),
        None => 0,
    };

    if has_currency {
        return format!("c{}", places);
    }
    if is_percent {
        return format!("p{}", places);
    }
    if body.contains("#,##0") {
        return format!("n{}", places);
    }
    if !body.is_empty() && !body.contains('.') && !body.contains('#') {
        // All zeros and grouping commas: a zero-padded integer.
        let zeros = body.chars().filter(|c| *c == '0').count();
        if zeros > 0 {
            return format!("d{}", zeros);
        }
    }
    if body.starts_with('0')
        && body.contains('.')
        && trimmed.chars().all(|c| matches!(c, '0' | '#' | '.' | ',' | '%'))
    {
        return format!("f{}", places);
    }

    // Nothing recognized: carry the section through verbatim.
    section.to_string()
}

fn date_code_to_compact(section: &str) -> String {
    let tokens = tokenize(section);
    let letter_runs: Vec<(usize, char)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(i, t)| match t {
            Token::Run(c, _) => Some((i, *c)),
            Token::Literal(_) => None,
        })
        .collect();
    let twelve_hour = section.contains("AM/PM") || section.contains("A/P");

    let mut out = String::with_capacity(section.len());
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Run(c, count) => {
                let mapped = match *c {
                    'm' => {
                        // Minute when the nearest letter neighbor is an hour
                        // or second run, month otherwise.
                        let pos = letter_runs.iter().position(|(ti, _)| *ti == i).unwrap_or(0);
                        let prev = pos.checked_sub(1).map(|p| letter_runs[p].1);
                        let next = letter_runs.get(pos + 1).map(|(_, c)| *c);
                        if prev == Some('h') || prev == Some('s') || next == Some('s') {
                            'm'
                        } else {
                            'M'
                        }
                    }
                    'h' => {
                        if twelve_hour {
                            'h'
                        } else {
                            'H'
                        }
                    }
                    other => other,
                };
                for _ in 0..*count {
                    out.push(mapped);
                }
            }
            Token::Literal(text) => {
                if text == "AM/PM" {
                    out.push_str("tt");
                } else if text == "A/P" {
                    out.push('t');
                } else {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

#[derive(Debug, PartialEq)]
enum Token {
    /// A run of a single pattern letter (`yyyy` -> ('y', 4)).
    Run(char, usize),
    /// A literal stretch: separators, quoted text, bracket groups.
    Literal(String),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() {
            // The AM/PM designators are literals, not letter runs.
            if pattern[byte_offset(&chars, i)..].starts_with("AM/PM") {
                tokens.push(Token::Literal("AM/PM".to_string()));
                i += 5;
                continue;
            }
            if pattern[byte_offset(&chars, i)..].starts_with("A/P") {
                tokens.push(Token::Literal("A/P".to_string()));
                i += 3;
                continue;
            }
            let mut count = 1;
            while i + count < chars.len() && chars[i + count] == c {
                count += 1;
            }
            tokens.push(Token::Run(c, count));
            i += count;
        } else if c == '"' {
            let mut lit = String::from('"');
            i += 1;
            while i < chars.len() {
                lit.push(chars[i]);
                if chars[i] == '"' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(Token::Literal(lit));
        } else if c == '[' {
            let mut lit = String::from('[');
            i += 1;
            while i < chars.len() {
                lit.push(chars[i]);
                if chars[i] == ']' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            tokens.push(Token::Literal(lit));
        } else {
            let mut lit = String::new();
            while i < chars.len()
                && !chars[i].is_ascii_alphabetic()
                && chars[i] != '"'
                && chars[i] != '['
            {
                lit.push(chars[i]);
                i += 1;
            }
            tokens.push(Token::Literal(lit));
        }
    }
    tokens
}

fn byte_offset(chars: &[char], idx: usize) -> usize {
    chars[..idx].iter().map(|c| c.len_utf8()).sum()
}

/// Split a numFmt code on `;` outside quoted literals and bracket groups.
fn split_sections(code: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escape = false;

    for c in code.chars() {
        if escape {
            current.push(c);
            escape = false;
            continue;
        }
        match c {
            '\\' => {
                current.push(c);
                escape = true;
            }
            '"' if !in_brackets => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' if !in_quotes => {
                in_brackets = true;
                current.push(c);
            }
            ']' if !in_quotes => {
                in_brackets = false;
                current.push(c);
            }
            ';' if !in_quotes && !in_brackets => {
                sections.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    sections.push(current);
    sections
}

/// Remove bracket groups, quoted literals, escapes and padding markers so
/// detection only sees the structural characters.
fn scrub_section(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut chars = section.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                // The next character is a literal/padding spec, not format.
                let _ = chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_kinds() {
        assert_eq!(to_num_fmt("n2", false), "#,##0.00");
        assert_eq!(to_num_fmt("n0", false), "#,##0");
        assert_eq!(to_num_fmt("f3", false), "0.000");
        assert_eq!(to_num_fmt("p1", false), "0.0%");
        assert_eq!(to_num_fmt("d4", false), "0000");
        assert_eq!(to_num_fmt("g2", false), "0.00");
        assert_eq!(to_num_fmt("", false), "General");
    }

    #[test]
    fn test_currency_template() {
        assert_eq!(to_num_fmt("c2", false), "$#,##0.00_);($#,##0.00)");
        assert_eq!(to_num_fmt("c0", false), "$#,##0_);($#,##0)");
    }

    #[test]
    fn test_date_shortcuts() {
        assert_eq!(to_num_fmt("r", true), "ddd, dd mmm yyyy hh:mm:ss \"GMT\"");
        assert_eq!(to_num_fmt("u", true), "yyyy-mm-dd hh:mm:ss\"Z\"");
        assert_eq!(to_num_fmt("O", true), "yyyy-mm-dd\"T\"hh:mm:ss.000");
    }

    #[test]
    fn test_date_pattern_case_folding() {
        assert_eq!(to_num_fmt("yyyy-MM-dd", true), "yyyy-mm-dd");
        assert_eq!(to_num_fmt("H:mm:ss", true), "h:mm:ss");
        assert_eq!(to_num_fmt("h:mm tt", true), "h:mm AM/PM");
        assert_eq!(to_num_fmt("h:mm t", true), "h:mm A/P");
    }

    #[test]
    fn test_fiscal_markers_fall_back_to_general() {
        assert_eq!(to_num_fmt("FY yyyy", true), "General");
        assert_eq!(to_num_fmt("yyyy Q", true), "General");
    }

    #[test]
    fn test_from_num_fmt_basics() {
        assert_eq!(from_num_fmt(""), vec![String::new()]);
        assert_eq!(from_num_fmt("General"), vec![String::new()]);
        assert_eq!(from_num_fmt("0.00%"), vec!["p2".to_string()]);
        assert_eq!(from_num_fmt("#,##0.00"), vec!["n2".to_string()]);
        assert_eq!(from_num_fmt("#,##0"), vec!["n0".to_string()]);
        assert_eq!(from_num_fmt("000"), vec!["d3".to_string()]);
        assert_eq!(from_num_fmt("0.000"), vec!["f3".to_string()]);
    }

    #[test]
    fn test_from_num_fmt_currency_sections() {
        assert_eq!(
            from_num_fmt("$#,##0.00_);($#,##0.00)"),
            vec!["c2".to_string(), "c2".to_string()]
        );
        assert_eq!(from_num_fmt("[$USD] #,##0.00"), vec!["c2".to_string()]);
    }

    #[test]
    fn test_from_num_fmt_dates() {
        assert_eq!(from_num_fmt("yyyy-mm-dd"), vec!["yyyy-MM-dd".to_string()]);
        assert_eq!(from_num_fmt("m/d/yy h:mm"), vec!["M/d/yy H:mm".to_string()]);
        assert_eq!(from_num_fmt("h:mm AM/PM"), vec!["h:mm tt".to_string()]);
        assert_eq!(from_num_fmt("mm:ss"), vec!["mm:ss".to_string()]);
    }

    #[test]
    fn test_numeric_round_trip() {
        for compact in ["n2", "c2", "p2", "f2", "d3", "n0"] {
            let code = to_num_fmt(compact, false);
            let back = from_num_fmt(&code);
            assert_eq!(back[0], compact, "via {}", code);
        }
    }

    #[test]
    fn test_date_round_trip() {
        for compact in ["yyyy-MM-dd", "H:mm:ss", "h:mm tt"] {
            let code = to_num_fmt(compact, true);
            let back = from_num_fmt(&code);
            assert_eq!(back[0], compact, "via {}", code);
        }
    }

    #[test]
    fn test_unrecognized_passes_through() {
        assert_eq!(from_num_fmt("0.00E+00"), vec!["0.00E+00".to_string()]);
        assert_eq!(from_num_fmt("@"), vec!["@".to_string()]);
    }

    #[test]
    fn test_is_date_format() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("h:mm"));
        assert!(is_date_format("[h]:mm:ss"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("0%"));
    }

    #[test]
    fn test_builtin_table() {
        assert_eq!(builtin_code(0), Some("General"));
        assert_eq!(builtin_code(9), Some("0%"));
        assert_eq!(builtin_id("0.00%"), Some(10));
        assert_eq!(builtin_id("m/d/yy h:mm"), Some(22));
        assert_eq!(builtin_code(50), None);
    }
}
