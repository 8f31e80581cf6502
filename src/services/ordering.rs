//! Ordering tokens and how they sort holder records.
//!
//! Every token maps through a static table either to a stored column
//! ([`OrderKey::Field`]) or to a value computed per record
//! ([`OrderKey::Computed`]). A trailing `_desc` or a leading `-` reverses
//! the direction.

use std::cmp::Ordering;

use tracing::error;

use crate::models::HolderRecord;

/// Tokens accepted in `order_by`, in the order the pre-render sweep uses.
pub const ORDERING_TOKENS: [&str; 12] = [
    "user__last_name",
    "user__last_name_desc",
    "user__email",
    "user__email_desc",
    "number",
    "number_desc",
    "share_count",
    "share_count_desc",
    "share_percent",
    "share_percent_desc",
    "cumulated_face_value",
    "cumulated_face_value_desc",
];

const DESC_SUFFIX: &str = "_desc";

/// Ordering failures. Both are caller or data bugs and are never defaulted.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderingError {
    #[error("Unknown ordering token '{0}'")]
    UnknownToken(String),

    #[error("Ordering '{token}' produced keys that cannot be compared ({records})")]
    IncomparableKeys { token: String, records: String },
}

/// Stored holder columns that can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderField {
    LastName,
    Email,
    Number,
}

impl HolderField {
    fn compare(&self, a: &HolderRecord, b: &HolderRecord) -> Ordering {
        match self {
            Self::LastName => a.last_name.cmp(&b.last_name),
            Self::Email => a.email.cmp(&b.email),
            Self::Number => a.number.cmp(&b.number),
        }
    }
}

/// A per-record value used for computed orderings.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    /// `None` or a falsy value; sorts below everything else.
    Missing,
    Number(f64),
    Text(String),
}

impl SortValue {
    /// Coerce a number, folding zero into [`SortValue::Missing`].
    pub fn number(value: f64) -> Self {
        if value == 0.0 || value.is_nan() {
            Self::Missing
        } else {
            Self::Number(value)
        }
    }

    /// Coerce a text, folding the empty string into [`SortValue::Missing`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Missing
        } else {
            Self::Text(value)
        }
    }

    fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Missing => None,
            Self::Number(_) => Some("numeric"),
            Self::Text(_) => Some("text"),
        }
    }

    /// Total order within one kind. Callers guarantee kinds are not mixed.
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => natural_cmp(a, b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// A named extractor computing a sort value from a record.
#[derive(Clone, Copy)]
pub struct ComputedKey {
    pub name: &'static str,
    pub extract: fn(&HolderRecord) -> SortValue,
}

impl std::fmt::Debug for ComputedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedKey")
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for ComputedKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// What an ordering token sorts by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKey {
    Field(HolderField),
    Computed(ComputedKey),
}

fn share_count(r: &HolderRecord) -> SortValue {
    SortValue::number(r.share_count as f64)
}

fn share_percent(r: &HolderRecord) -> SortValue {
    r.share_percent.map_or(SortValue::Missing, SortValue::number)
}

fn cumulated_face_value(r: &HolderRecord) -> SortValue {
    SortValue::number(r.cumulated_face_value)
}

static ORDER_KEYS: &[(&str, OrderKey)] = &[
    ("user__last_name", OrderKey::Field(HolderField::LastName)),
    ("user__email", OrderKey::Field(HolderField::Email)),
    ("number", OrderKey::Field(HolderField::Number)),
    (
        "share_count",
        OrderKey::Computed(ComputedKey {
            name: "share_count",
            extract: share_count,
        }),
    ),
    (
        "share_percent",
        OrderKey::Computed(ComputedKey {
            name: "share_percent",
            extract: share_percent,
        }),
    ),
    (
        "cumulated_face_value",
        OrderKey::Computed(ComputedKey {
            name: "cumulated_face_value",
            extract: cumulated_face_value,
        }),
    ),
];

/// A parsed ordering token.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    /// The token as given, direction marker included.
    pub token: String,
    pub key: OrderKey,
    pub descending: bool,
}

impl OrderSpec {
    /// Resolve a token against the static key table.
    pub fn parse(token: &str) -> Result<Self, OrderingError> {
        let trimmed = token.trim();
        let (name, descending) = if let Some(rest) = trimmed.strip_prefix('-') {
            (rest, true)
        } else if let Some(rest) = trimmed.strip_suffix(DESC_SUFFIX) {
            (rest, true)
        } else {
            (trimmed, false)
        };

        let key = ORDER_KEYS
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, key)| *key)
            .ok_or_else(|| OrderingError::UnknownToken(token.to_string()))?;

        Ok(Self {
            token: token.to_string(),
            key,
            descending,
        })
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.key, OrderKey::Computed(_))
    }

    /// The stored column and direction, for pushing the ordering into a query.
    pub fn field_order(&self) -> Option<(HolderField, bool)> {
        match self.key {
            OrderKey::Field(field) => Some((field, self.descending)),
            OrderKey::Computed(_) => None,
        }
    }

    /// Sort `records` into a stable total order.
    ///
    /// Ties keep their input order in both directions. Empty input is
    /// returned as is.
    pub fn apply(&self, mut records: Vec<HolderRecord>) -> Result<Vec<HolderRecord>, OrderingError> {
        if records.is_empty() {
            return Ok(records);
        }

        match self.key {
            OrderKey::Field(field) => {
                if self.descending {
                    records.sort_by(|a, b| field.compare(b, a));
                } else {
                    records.sort_by(|a, b| field.compare(a, b));
                }
                Ok(records)
            }
            OrderKey::Computed(key) => self.sort_computed(records, key),
        }
    }

    /// Order records a store already returned sorted by
    /// [`field_order`](Self::field_order).
    ///
    /// Stored-field keys keep the store's order, including its collation and
    /// NULL placement. Computed keys are sorted as in [`apply`](Self::apply).
    pub fn apply_presorted(
        &self,
        records: Vec<HolderRecord>,
    ) -> Result<Vec<HolderRecord>, OrderingError> {
        match self.key {
            OrderKey::Field(_) => Ok(records),
            OrderKey::Computed(_) => self.apply(records),
        }
    }

    fn sort_computed(
        &self,
        records: Vec<HolderRecord>,
        key: ComputedKey,
    ) -> Result<Vec<HolderRecord>, OrderingError> {
        let mut keyed: Vec<(SortValue, HolderRecord)> = records
            .into_iter()
            .map(|r| ((key.extract)(&r), r))
            .collect();

        let mut kinds = keyed.iter().filter_map(|(v, _)| v.kind());
        if let Some(first) = kinds.next()
            && kinds.any(|k| k != first)
        {
            let description = describe_keys(&keyed);
            error!(
                token = %self.token,
                records = %description,
                "Computed ordering produced incomparable keys"
            );
            return Err(OrderingError::IncomparableKeys {
                token: self.token.clone(),
                records: description,
            });
        }

        if self.descending {
            keyed.sort_by(|(a, _), (b, _)| b.compare(a));
        } else {
            keyed.sort_by(|(a, _), (b, _)| a.compare(b));
        }

        Ok(keyed.into_iter().map(|(_, r)| r).collect())
    }
}

fn describe_keys(keyed: &[(SortValue, HolderRecord)]) -> String {
    let numeric = keyed
        .iter()
        .filter(|(v, _)| matches!(v, SortValue::Number(_)))
        .count();
    let text = keyed
        .iter()
        .filter(|(v, _)| matches!(v, SortValue::Text(_)))
        .count();
    format!(
        "{} holder records: {} numeric, {} text, {} missing",
        keyed.len(),
        numeric,
        text,
        keyed.len() - numeric - text
    )
}

/// Compare strings so that embedded digit runs sort by value (`"9" < "10"`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let ordering = compare_digit_runs(&lhs, &rhs);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}
