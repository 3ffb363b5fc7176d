/// Leading characters that make spreadsheet software treat a cell as a formula.
const FORMULA_TRIGGERS: [char; 6] = ['=', '+', '-', '@', '\t', '\r'];

/// Escapes a single CSV field.
///
/// Formula neutralization always runs before quoting, so the prepended `'`
/// ends up inside the quoted field.
pub fn escape_csv_field(value: &str) -> String {
    let neutralized = neutralize_formula(value);
    quote_field(&neutralized)
}

/// Prepends `'` to values a spreadsheet would otherwise evaluate.
pub fn neutralize_formula(value: &str) -> String {
    match value.chars().next() {
        Some(first) if FORMULA_TRIGGERS.contains(&first) => format!("'{}", value),
        _ => value.to_string(),
    }
}

fn quote_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Builds CSV text from a header and rows, escaping every field. Lines end with CRLF.
pub struct CsvTable {
    columns: usize,
    out: String,
}

impl CsvTable {
    pub fn new(header: &[&str]) -> Self {
        let mut table = Self {
            columns: header.len(),
            out: String::new(),
        };
        table.push_line(header.iter().map(|h| h.to_string()));
        table
    }

    /// Appends a row. Missing trailing cells are left empty, extra cells are dropped.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut row: Vec<String> = cells
            .into_iter()
            .take(self.columns)
            .map(|c| c.as_ref().to_string())
            .collect();
        row.resize(self.columns, String::new());
        self.push_line(row.into_iter());
    }

    fn push_line(&mut self, cells: impl Iterator<Item = String>) {
        let line = cells
            .map(|c| escape_csv_field(&c))
            .collect::<Vec<_>>()
            .join(",");
        self.out.push_str(&line);
        self.out.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.out
    }
}
