use crate::domain::FetchTask;
use crate::error::PackError;
use crate::table::Table;

pub const ITEM_COLUMN: &str = "Item";
pub const URL_COLUMN: &str = "URL";

/// Data rows are numbered the way a spreadsheet shows them: row 1 is the
/// header, so the first data row is row 2.
const FIRST_DATA_ROW: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub item: usize,
    pub url: usize,
}

impl ColumnLayout {
    pub fn locate(table: &Table) -> Result<Self, PackError> {
        let item = table.column(ITEM_COLUMN);
        let url = table.column(URL_COLUMN);
        match (item, url) {
            (Some(item), Some(url)) => Ok(Self { item, url }),
            _ => {
                let missing = [(ITEM_COLUMN, item), (URL_COLUMN, url)]
                    .into_iter()
                    .filter(|(_, index)| index.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(PackError::MissingColumns(missing))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub tasks: Vec<FetchTask>,
    pub skipped: usize,
}

/// Turns table rows into fetch tasks. Rows without a URL are skipped silently;
/// they are not failures and do not count toward the run total.
pub fn normalize_rows(table: &Table, layout: ColumnLayout) -> Normalized {
    let mut normalized = Normalized::default();

    for position in 0..table.len() {
        let row_index = position as u64 + FIRST_DATA_ROW;
        let url = table
            .cell(position, layout.url)
            .map(str::trim)
            .filter(|url| !url.is_empty());
        let Some(url) = url else {
            tracing::debug!(row = row_index, "no URL, skipping row");
            normalized.skipped += 1;
            continue;
        };

        let display_name = table
            .cell(position, layout.item)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            // Blank names get a row label instead of an empty or "nan" file name.
            .unwrap_or_else(|| format!("row-{row_index}"));

        normalized.tasks.push(FetchTask {
            row_index,
            display_name,
            source_url: Some(url.to_string()),
        });
    }

    normalized
}
