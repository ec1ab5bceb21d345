use std::collections::HashSet;

/// Column the uploaded file must carry, matched case-sensitively.
pub const USERNAME_COLUMN: &str = "username";

/// Cell values treated as missing, mirroring the usual spreadsheet NA markers.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("CSV must contain a 'username' column.")]
    MissingColumn,

    #[error("The uploaded file is empty.")]
    Empty,

    #[error("Could not read the uploaded file as CSV: {0}")]
    Unreadable(#[from] csv::Error),
}

/// Read the `username` column of an uploaded CSV.
///
/// Missing cells are dropped and duplicates removed, keeping the first
/// occurrence. Values are trimmed of surrounding whitespace before the
/// missing check and dedup, so `" alice"` and `"alice"` name the same user
/// and `" NaN"` counts as missing. This is stricter than reading the column
/// verbatim and is intentional.
pub fn load_usernames(data: &[u8]) -> Result<Vec<String>, ValidationError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?;
    if headers.is_empty() {
        return Err(ValidationError::Empty);
    }
    let index = headers
        .iter()
        .position(|name| name == USERNAME_COLUMN)
        .ok_or(ValidationError::MissingColumn)?;

    let mut seen = HashSet::new();
    let mut usernames = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(cell) = record.get(index).map(str::trim) else {
            continue;
        };
        if is_missing(cell) {
            continue;
        }
        if seen.insert(cell.to_string()) {
            usernames.push(cell.to_string());
        }
    }

    Ok(usernames)
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || NA_TOKENS.contains(&cell)
}
