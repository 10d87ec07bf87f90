use crate::error::AppError;

/// Strip formatting from a raw phone number, keeping digits only.
pub fn normalize_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Split a pasted blob of numbers on commas and line breaks.
pub fn split_number_list(text: &str) -> Vec<&str> {
    text.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub struct CsvNumberRow {
    pub number: String,
    pub name: Option<String>,
}

/// Parse a header-addressed CSV of numbers.  The number column may be named
/// `number`, `phone`, or `phone_number`; a `name` column is optional.  Rows
/// with an empty number cell are skipped.
pub fn parse_number_csv(content: &str) -> Result<Vec<CsvNumberRow>, AppError> {
    let mut lines = content.lines();
    let header = lines.next().ok_or(AppError("csv is empty"))?;
    let columns: Vec<String> = header
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
        .collect();
    let number_idx = columns
        .iter()
        .position(|c| matches!(c.as_str(), "number" | "phone" | "phone_number"))
        .ok_or(AppError("csv has no number column"))?;
    let name_idx = columns.iter().position(|c| c == "name");

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line
            .split(',')
            .map(|f| f.trim().trim_matches('"'))
            .collect();
        let number = match fields.get(number_idx) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };
        let name = name_idx
            .and_then(|i| fields.get(i))
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string());
        rows.push(CsvNumberRow { number, name });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_formatting() {
        assert_eq!(normalize_number("+1 (500) 555-0006"), "15005550006");
        assert_eq!(normalize_number("18001234567"), "18001234567");
        assert_eq!(normalize_number("ext."), "");
    }

    #[test]
    fn split_handles_commas_and_newlines() {
        let numbers = split_number_list("18001234567, 18002345678\n18003456789\r\n");
        assert_eq!(
            numbers,
            vec!["18001234567", "18002345678", "18003456789"]
        );
    }

    #[test]
    fn csv_number_header() {
        let rows = parse_number_csv("number,name\n18001234567,Office\n18002345678,\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, "18001234567");
        assert_eq!(rows[0].name.as_deref(), Some("Office"));
        assert!(rows[1].name.is_none());
    }

    #[test]
    fn csv_header_aliases() {
        for header in ["phone", "phone_number", "Number"] {
            let content = format!("{header}\n18001234567\n");
            let rows = parse_number_csv(&content).unwrap();
            assert_eq!(rows.len(), 1, "header {header}");
            assert_eq!(rows[0].number, "18001234567");
        }
    }

    #[test]
    fn csv_without_number_column_is_rejected() {
        assert!(parse_number_csv("name,email\nBob,bob@example.com\n").is_err());
    }
}
