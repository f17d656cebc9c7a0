//! In-memory document representation and structured table extraction.
//!
//! Collaborators hand over filings and summary pages as a generic tree of
//! labeled rows and cells. [`extract_tables`] turns the regions of interest
//! into [`RawTable`]s: per row, the first cell is the label and the rest are
//! the ordered value sequence. Fetching the document is the collaborator's
//! job; everything here is a pure transform.

/// One node of a collaborator-supplied document tree.
///
/// Regions carry an `id` that container selectors match against. Cells
/// flagged `header_like` are decorative or label-repeating and are never
/// included in a row's value sequence.
#[derive(Debug, Clone, Default)]
pub struct DocumentNode {
    pub id: Option<String>,
    pub header_like: bool,
    pub text: String,
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn region(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn row() -> Self {
        Self::default()
    }

    pub fn cell(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn header_cell(text: &str) -> Self {
        Self {
            text: text.to_string(),
            header_like: true,
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: DocumentNode) -> Self {
        self.children.push(child);
        self
    }

    fn find_region(&self, id: &str) -> Option<&DocumentNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_region(id))
    }
}

/// A normalized cell value. Malformed or placeholder cells are preserved as
/// `Missing` rather than rejected; downstream components decide the fallback
/// policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Num(f64),
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }

    /// Value in won, with the 0-as-missing sentinel applied.
    pub fn amount(&self) -> i64 {
        match self {
            RawValue::Num(v) => v.round() as i64,
            RawValue::Missing => 0,
        }
    }
}

/// Mapping from normalized row label to ordered value sequence, preserving
/// document row order. Not mutated after extraction.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    rows: Vec<(String, Vec<RawValue>)>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, label: String, values: Vec<RawValue>) {
        self.rows.push((label, values));
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[RawValue])> {
        self.rows.iter().map(|(l, v)| (l.as_str(), v.as_slice()))
    }
}

/// Extract one [`RawTable`] per matched container selector.
///
/// A selector with no matching region yields no table (not an error); a
/// matched region with no usable rows yields an empty table, which callers
/// treat with not-found semantics.
pub fn extract_tables(doc: &DocumentNode, selectors: &[&str]) -> Vec<RawTable> {
    selectors
        .iter()
        .filter_map(|sel| doc.find_region(sel))
        .map(extract_table)
        .collect()
}

fn extract_table(region: &DocumentNode) -> RawTable {
    let mut table = RawTable::new();
    for row in &region.children {
        let mut cells = row.children.iter();
        let label = match cells.next() {
            Some(cell) => normalize_label(&cell.text),
            None => continue,
        };
        if label.is_empty() {
            continue;
        }
        let values: Vec<RawValue> = cells
            .filter(|c| !c.header_like)
            .map(|c| parse_cell(&c.text))
            .collect();
        table.push_row(label, values);
    }
    table
}

/// Collapse all whitespace (including NBSP) out of a row label so alias
/// matching is insensitive to filer formatting.
pub fn normalize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect()
}

/// Parse one cell into a [`RawValue`]. Thousands separators and percent
/// signs are stripped; locale dashes used as "no value" become `Missing`,
/// as does anything that still fails to parse.
fn parse_cell(raw: &str) -> RawValue {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != ',' && *c != '%')
        .collect();
    if cleaned.is_empty() || matches!(cleaned.as_str(), "-" | "–" | "—") {
        return RawValue::Missing;
    }
    match cleaned.parse::<f64>() {
        Ok(v) => RawValue::Num(v),
        Err(_) => RawValue::Missing,
    }
}
