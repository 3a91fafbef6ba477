use crate::error::ParseError;
use crate::series::table::SeriesTable;
use regex::Regex;

/// How to treat lines that do not carry a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Keep the key with a NaN value.
    #[default]
    Lenient,
    /// Reject the payload at the first such line.
    Strict,
}

/// Parse a `key,value` payload into a series table.
///
/// Expected shape (no header, no quoting):
/// login,100
/// logout,50.5
///
/// Every `\n`-separated line produces an entry. The key is the text before
/// the first comma; the value is the second field read as a leading float
/// (`"12ms"` reads as 12). Lines without a number map to NaN in lenient mode.
pub fn parse_series(text: &str, mode: ParseMode) -> Result<SeriesTable, ParseError> {
    // Leading whitespace, then the longest float prefix.
    let re = Regex::new(r#"^\s*([+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?))"#)?;

    let mut out = SeriesTable::new();
    let lines: Vec<&str> = text.split('\n').collect();
    for (lineno, line) in lines.iter().enumerate() {
        let mut fields = line.split(',');
        let key = fields.next().unwrap_or_default();
        let value = fields
            .next()
            .and_then(|field| re.captures(field))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(f64::NAN);

        if value.is_nan() && mode == ParseMode::Strict {
            let trailing = lineno + 1 == lines.len() && line.is_empty();
            if trailing {
                continue;
            }
            return Err(ParseError::Malformed {
                line: lineno + 1,
                content: line.to_string(),
            });
        }

        out.insert(key, value);
    }

    Ok(out)
}
