//! Pure filter and sort semantics over schema-typed rows

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::row::{parse_date, FieldKind, FieldValue, Row, RowSchema};

/// Field name → predicate text. Empty entries impose no constraint.
pub type FilterState = BTreeMap<String, String>;

/// Suffixes that turn a date field's filter into an inclusive range
pub const RANGE_START_SUFFIX: &str = "Start";
pub const RANGE_END_SUFFIX: &str = "End";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

/// The single active sort column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

enum Predicate {
    Contains { field: String, needle: String },
    DateRange {
        field: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// A [`FilterState`] resolved against a schema, ready to test rows
pub struct CompiledFilter {
    predicates: Vec<Predicate>,
}

impl CompiledFilter {
    pub fn compile(schema: &RowSchema, filter: &FilterState) -> Self {
        let mut predicates = Vec::new();

        for (name, raw) in filter {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }

            if let Some(field) = range_field(schema, name, RANGE_START_SUFFIX) {
                let end_key = format!("{field}{RANGE_END_SUFFIX}");
                let end_raw = filter.get(&end_key).map(|s| s.trim()).unwrap_or("");
                match (parse_date(value), parse_range_end(end_raw)) {
                    (Some(start), Some(end)) => predicates.push(Predicate::DateRange {
                        field: field.to_string(),
                        start,
                        end,
                    }),
                    _ => tracing::debug!("Ignoring incomplete date range on '{field}'"),
                }
                continue;
            }
            if range_field(schema, name, RANGE_END_SUFFIX).is_some() {
                // Consumed together with the matching start entry
                continue;
            }

            if schema.field(name).is_none() {
                tracing::debug!("Ignoring filter on undeclared field '{name}'");
                continue;
            }
            predicates.push(Predicate::Contains {
                field: name.clone(),
                needle: value.to_lowercase(),
            });
        }

        Self { predicates }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// All predicates ANDed
    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Contains { field, needle } => {
                row.text(field).to_lowercase().contains(needle.as_str())
            }
            Predicate::DateRange { field, start, end } => match row.value(field) {
                FieldValue::Date(date) => date >= start && date <= end,
                _ => false,
            },
        })
    }
}

/// If `name` is `<date field><suffix>`, return the date field
fn range_field<'a>(schema: &RowSchema, name: &'a str, suffix: &str) -> Option<&'a str> {
    let field = name.strip_suffix(suffix)?;
    (schema.kind_of(field) == Some(FieldKind::Date)).then_some(field)
}

/// A date-only end bound covers the whole day
fn parse_range_end(raw: &str) -> Option<NaiveDateTime> {
    let end = parse_date(raw)?;
    if end.time() == NaiveTime::MIN && !raw.contains(':') {
        end.date().and_hms_opt(23, 59, 59)
    } else {
        Some(end)
    }
}

/// Compare two values of a field of the given kind. `Empty` (and values of
/// the wrong type) sort as the minimum.
pub fn compare_values(kind: FieldKind, a: &FieldValue, b: &FieldValue) -> Ordering {
    match kind {
        FieldKind::Number => match (a, b) {
            (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(y),
            (FieldValue::Number(_), _) => Ordering::Greater,
            (_, FieldValue::Number(_)) => Ordering::Less,
            _ => Ordering::Equal,
        },
        FieldKind::Date => match (a, b) {
            (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
            (FieldValue::Date(_), _) => Ordering::Greater,
            (_, FieldValue::Date(_)) => Ordering::Less,
            _ => Ordering::Equal,
        },
        FieldKind::Text => match (a.is_empty(), b.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.display().cmp(&b.display()),
        },
    }
}

/// Stable sort of row indices by the active sort state
pub fn sort_indices(schema: &RowSchema, rows: &[Row], indices: &mut [usize], sort: &SortState) {
    let Some(kind) = schema.kind_of(&sort.key) else {
        tracing::debug!("Ignoring sort on undeclared field '{}'", sort.key);
        return;
    };
    indices.sort_by(|&a, &b| {
        let ordering = compare_values(kind, rows[a].value(&sort.key), rows[b].value(&sort.key));
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}
