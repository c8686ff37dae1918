//! Task list filters and the query builder behind `list_tasks`
//!
//! Filter columns come from a closed enum; filter values only ever reach
//! SQL through `push_bind`, so caller text never becomes query text.

use sqlx::{Postgres, QueryBuilder};

use super::StoreError;
use crate::models::ValidationError;

/// Page size when the caller gives none
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Hard ceiling on page size
pub const MAX_LIST_LIMIT: u32 = 500;

const HEADER_SELECT: &str =
    "SELECT id, task_id, task_name, sector, occupation, status, created_at FROM gdpval_tasks";

/// Columns a listing may be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Sector,
    Occupation,
    Status,
}

impl FilterField {
    pub const ALL: [FilterField; 3] = [Self::Sector, Self::Occupation, Self::Status];

    pub fn column(&self) -> &'static str {
        match self {
            Self::Sector => "sector",
            Self::Occupation => "occupation",
            Self::Status => "status",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == key)
    }
}

/// Equality filters, AND-combined. Absent fields don't narrow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub sector: Option<String>,
    pub occupation: Option<String>,
    pub status: Option<String>,
}

impl TaskFilter {
    pub fn sector(mut self, value: impl Into<String>) -> Self {
        self.set(FilterField::Sector, value.into());
        self
    }

    pub fn occupation(mut self, value: impl Into<String>) -> Self {
        self.set(FilterField::Occupation, value.into());
        self
    }

    pub fn status(mut self, value: impl Into<String>) -> Self {
        self.set(FilterField::Status, value.into());
        self
    }

    /// Empty values are treated as "no filter".
    pub fn set(&mut self, field: FilterField, value: String) {
        let value = (!value.is_empty()).then_some(value);
        match field {
            FilterField::Sector => self.sector = value,
            FilterField::Occupation => self.occupation = value,
            FilterField::Status => self.status = value,
        }
    }

    pub fn get(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Sector => self.sector.as_deref(),
            FilterField::Occupation => self.occupation.as_deref(),
            FilterField::Status => self.status.as_deref(),
        }
    }

    /// Active predicates in a fixed column order
    pub fn predicates(&self) -> impl Iterator<Item = (FilterField, &str)> + '_ {
        FilterField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|value| (field, value)))
    }
}

/// One page request: filters plus limit/offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: TaskFilter,
    pub limit: u32,
    pub offset: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::default(),
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListQuery {
    /// `limit` is capped at `MAX_LIST_LIMIT`; zero asks for an empty page.
    pub fn new(filter: TaskFilter, limit: u32, offset: u64) -> Self {
        Self {
            filter,
            limit: limit.min(MAX_LIST_LIMIT),
            offset,
        }
    }

    /// Build from raw query-string pairs.
    ///
    /// Unknown keys fail with `InvalidFilter` before anything touches the store.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = TaskFilter::default();
        let mut limit = u64::from(DEFAULT_LIST_LIMIT);
        let mut offset = 0;

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.into();
            match key {
                "limit" => limit = parse_count("limit", &value)?,
                "offset" => offset = parse_count("offset", &value)?,
                _ => match FilterField::from_key(key) {
                    Some(field) => filter.set(field, value),
                    None => {
                        return Err(StoreError::InvalidFilter {
                            key: key.to_owned(),
                        })
                    }
                },
            }
        }

        let limit = u32::try_from(limit).unwrap_or(MAX_LIST_LIMIT);
        Ok(Self::new(filter, limit, offset))
    }

    /// Compose the parameterized listing query.
    pub fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(HEADER_SELECT);

        for (i, (field, value)) in self.filter.predicates().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(field.column());
            builder.push(" = ");
            builder.push_bind(value.to_owned());
        }

        // id breaks ties between rows created in the same instant
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(i64::from(self.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(self.offset).unwrap_or(i64::MAX));
        builder
    }
}

fn parse_count(field: &'static str, value: &str) -> Result<u64, StoreError> {
    value.trim().parse::<u64>().map_err(|_| {
        StoreError::Validation(ValidationError::InvalidFormat {
            field,
            reason: "must be a non-negative integer",
        })
    })
}
