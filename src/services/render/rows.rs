//! Projection of holder records into localized text tables.

use chrono::{DateTime, Utc};

use crate::models::{CompanySnapshot, HolderRecord};
use crate::services::segments::human_readable_segments;

/// Shown instead of a percentage when percentages are not computed.
pub const PERCENT_PLACEHOLDER: &str = "--";

/// Language of labels and headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    De,
}

impl Locale {
    /// Map a stored language code, defaulting to English.
    pub fn from_language(language: Option<&str>) -> Self {
        match language.map(|l| l.trim().to_ascii_lowercase()) {
            Some(l) if l == "de" || l.starts_with("de-") || l.starts_with("de_") => Self::De,
            _ => Self::En,
        }
    }
}

/// Output columns a report may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Number,
    FirstName,
    LastName,
    Email,
    ShareCount,
    OptionCount,
    VestedCount,
    Percent,
    Language,
    TrackedNumbers,
    Signature,
}

impl Column {
    pub fn label(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Number, Locale::En) => "Number",
            (Self::Number, Locale::De) => "Nummer",
            (Self::FirstName, Locale::En) => "First name",
            (Self::FirstName, Locale::De) => "Vorname",
            (Self::LastName, Locale::En) => "Last name",
            (Self::LastName, Locale::De) => "Nachname",
            (Self::Email, Locale::En) => "Email",
            (Self::Email, Locale::De) => "E-Mail",
            (Self::ShareCount, Locale::En) => "Shares",
            (Self::ShareCount, Locale::De) => "Aktien",
            (Self::OptionCount, Locale::En) => "Options",
            (Self::OptionCount, Locale::De) => "Optionen",
            (Self::VestedCount, Locale::En) => "Vested",
            (Self::VestedCount, Locale::De) => "Gevestet",
            (Self::Percent, Locale::En) => "Percent",
            (Self::Percent, Locale::De) => "Prozent",
            (Self::Language, Locale::En) => "Language",
            (Self::Language, Locale::De) => "Sprache",
            (Self::TrackedNumbers, Locale::En) => "Share numbers",
            (Self::TrackedNumbers, Locale::De) => "Aktiennummern",
            (Self::Signature, Locale::En) => "Signature",
            (Self::Signature, Locale::De) => "Unterschrift",
        }
    }
}

/// Document-level labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Captable,
    AssemblyParticipation,
    VestedShares,
    Shareholders,
    OptionHolders,
    Participants,
    AsOf,
    TotalCapital,
    ProvisionedCapital,
    TotalShares,
    TotalOptions,
}

impl Label {
    pub fn text(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Captable, Locale::En) => "Cap table",
            (Self::Captable, Locale::De) => "Aktionärsliste",
            (Self::AssemblyParticipation, Locale::En) => "Assembly participation",
            (Self::AssemblyParticipation, Locale::De) => "Teilnehmerliste Generalversammlung",
            (Self::VestedShares, Locale::En) => "Vested options",
            (Self::VestedShares, Locale::De) => "Gevestete Optionen",
            (Self::Shareholders, Locale::En) => "Shareholders",
            (Self::Shareholders, Locale::De) => "Aktionäre",
            (Self::OptionHolders, Locale::En) => "Option holders",
            (Self::OptionHolders, Locale::De) => "Optionsinhaber",
            (Self::Participants, Locale::En) => "Participants",
            (Self::Participants, Locale::De) => "Teilnehmer",
            (Self::AsOf, Locale::En) => "As of",
            (Self::AsOf, Locale::De) => "Stichtag",
            (Self::TotalCapital, Locale::En) => "Total capital",
            (Self::TotalCapital, Locale::De) => "Aktienkapital",
            (Self::ProvisionedCapital, Locale::En) => "Provisioned capital",
            (Self::ProvisionedCapital, Locale::De) => "Bedingtes Kapital",
            (Self::TotalShares, Locale::En) => "Total shares",
            (Self::TotalShares, Locale::De) => "Total Aktien",
            (Self::TotalOptions, Locale::En) => "Total options",
            (Self::TotalOptions, Locale::De) => "Total Optionen",
        }
    }
}

/// A raw cell value before text coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(Option<String>),
    Integer(i64),
    Decimal(f64),
}

impl Cell {
    /// Coerce to display text. Falsy values (`None`, empty, zero) become `""`.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(value) => value.unwrap_or_default(),
            Self::Integer(0) => String::new(),
            Self::Integer(n) => n.to_string(),
            Self::Decimal(f) if f == 0.0 || !f.is_finite() => String::new(),
            Self::Decimal(f) => format!("{:.2}", f),
        }
    }
}

/// One named table of text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything a serializer writes.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub company: String,
    pub as_of: DateTime<Utc>,
    /// Label/value pairs shown above the tables.
    pub figures: Vec<(String, String)>,
    pub sheets: Vec<Sheet>,
}

/// Options shared by every projection of one render.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub locale: Locale,
    /// `false` replaces percentages with [`PERCENT_PLACEHOLDER`].
    pub show_percent: bool,
    /// Append the tracked unit summary column.
    pub show_tracked: bool,
}

impl Projection {
    /// Columns of a holder table, with the tracked summary appended when enabled.
    pub fn columns(&self, base: &[Column]) -> Vec<Column> {
        let mut columns = base.to_vec();
        if self.show_tracked {
            columns.push(Column::TrackedNumbers);
        }
        columns
    }

    pub fn sheet(&self, title: &str, base: &[Column], records: &[HolderRecord]) -> Sheet {
        let columns = self.columns(base);
        Sheet {
            title: title.to_string(),
            header: columns
                .iter()
                .map(|c| c.label(self.locale).to_string())
                .collect(),
            rows: records.iter().map(|r| self.row(&columns, r)).collect(),
        }
    }

    pub fn row(&self, columns: &[Column], record: &HolderRecord) -> Vec<String> {
        columns.iter().map(|c| self.cell(*c, record)).collect()
    }

    fn cell(&self, column: Column, record: &HolderRecord) -> String {
        let cell = match column {
            Column::Number => Cell::Text(Some(record.number.clone())),
            Column::FirstName => Cell::Text(Some(record.first_name.clone())),
            Column::LastName => Cell::Text(Some(record.last_name.clone())),
            Column::Email => Cell::Text(record.email.clone()),
            Column::ShareCount | Column::OptionCount => Cell::Integer(record.share_count),
            Column::VestedCount => Cell::Integer(record.vested_count),
            Column::Percent if !self.show_percent => {
                return PERCENT_PLACEHOLDER.to_string();
            }
            Column::Percent => record.share_percent.map_or(Cell::Text(None), Cell::Decimal),
            Column::Language => Cell::Text(record.language.clone()),
            Column::TrackedNumbers => Cell::Text(Some(tracked_summary(record))),
            Column::Signature => Cell::Text(None),
        };
        cell.into_text()
    }
}

/// `"<title>: <segments> "` for every tracked security, concatenated.
pub fn tracked_summary(record: &HolderRecord) -> String {
    record
        .tracked_units
        .iter()
        .map(|t| {
            format!(
                "{}: {} ",
                t.security_title,
                human_readable_segments(t.unit_ids.iter().copied())
            )
        })
        .collect()
}

/// Aggregate figures of the company, localized.
pub fn company_figures(snapshot: &CompanySnapshot, locale: Locale) -> Vec<(String, String)> {
    vec![
        (
            Label::TotalCapital.text(locale).to_string(),
            format!("{:.2}", snapshot.total_capital()),
        ),
        (
            Label::ProvisionedCapital.text(locale).to_string(),
            format!("{:.2}", snapshot.provisioned_capital()),
        ),
        (
            Label::TotalShares.text(locale).to_string(),
            snapshot.total_shares().to_string(),
        ),
        (
            Label::TotalOptions.text(locale).to_string(),
            snapshot.total_options().to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyInfo, SecurityInfo, TrackedUnits};
    use chrono::Utc;
    use uuid::Uuid;

    fn record() -> HolderRecord {
        HolderRecord {
            id: Uuid::now_v7(),
            number: "7".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            language: Some("en".to_string()),
            share_count: 4,
            vested_count: 4,
            cumulated_face_value: 4.0,
            share_percent: Some(12.5),
            tracked_units: vec![
                TrackedUnits {
                    security_id: Uuid::now_v7(),
                    security_title: "Common".to_string(),
                    unit_ids: [1, 2, 3, 5].into_iter().collect(),
                },
                TrackedUnits {
                    security_id: Uuid::now_v7(),
                    security_title: "Preferred".to_string(),
                    unit_ids: [9].into_iter().collect(),
                },
            ],
        }
    }

    #[test]
    fn test_locale_from_language() {
        assert_eq!(Locale::from_language(Some("de")), Locale::De);
        assert_eq!(Locale::from_language(Some("de-CH")), Locale::De);
        assert_eq!(Locale::from_language(Some("fr")), Locale::En);
        assert_eq!(Locale::from_language(None), Locale::En);
    }

    #[test]
    fn test_falsy_values_become_empty_text() {
        assert_eq!(Cell::Text(None).into_text(), "");
        assert_eq!(Cell::Integer(0).into_text(), "");
        assert_eq!(Cell::Decimal(0.0).into_text(), "");
        assert_eq!(Cell::Integer(12).into_text(), "12");
        assert_eq!(Cell::Decimal(33.333).into_text(), "33.33");
    }

    #[test]
    fn test_tracked_summary() {
        assert_eq!(tracked_summary(&record()), "Common: 1-3,5 Preferred: 9 ");
    }

    #[test]
    fn test_row_projection() {
        let projection = Projection {
            locale: Locale::De,
            show_percent: true,
            show_tracked: true,
        };
        let sheet = projection.sheet(
            "Aktionäre",
            &[Column::Number, Column::Email, Column::ShareCount, Column::Percent],
            &[record()],
        );

        assert_eq!(
            sheet.header,
            vec!["Nummer", "E-Mail", "Aktien", "Prozent", "Aktiennummern"]
        );
        assert_eq!(
            sheet.rows[0],
            vec!["7", "", "4", "12.50", "Common: 1-3,5 Preferred: 9 "]
        );
    }

    #[test]
    fn test_percent_placeholder_and_untracked_companies() {
        let projection = Projection {
            locale: Locale::En,
            show_percent: false,
            show_tracked: false,
        };
        let columns = projection.columns(&[Column::Number, Column::Percent]);
        assert_eq!(columns, vec![Column::Number, Column::Percent]);
        assert_eq!(projection.row(&columns, &record()), vec!["7", PERCENT_PLACEHOLDER]);
    }

    #[test]
    fn test_company_figures_count_shares_and_options() {
        let mut option_holder = record();
        option_holder.share_count = 6;
        option_holder.cumulated_face_value = 0.6;
        let snapshot = CompanySnapshot {
            company: CompanyInfo {
                id: Uuid::now_v7(),
                name: "Acme".to_string(),
            },
            as_of: Utc::now(),
            securities: vec![SecurityInfo {
                id: Uuid::now_v7(),
                title: "Common".to_string(),
                face_value: 1.0,
                track_numbers: true,
            }],
            shareholders: vec![record(), record()],
            option_holders: vec![option_holder],
        };

        let figures = company_figures(&snapshot, Locale::De);
        assert_eq!(figures.len(), 4);
        assert_eq!(figures[2], ("Total Aktien".to_string(), "8".to_string()));
        assert_eq!(figures[3], ("Total Optionen".to_string(), "6".to_string()));
    }
}
