//! Renderer lookup keyed by report type and file type.

use crate::models::{CompanySnapshot, FileType, ReportType};

use super::RenderError;
use super::pdf::write_pdf;
use super::rows::{Column, Label, Locale, Projection, ReportDocument, company_figures};
use super::xlsx::write_workbook;

/// Inputs of a serializer: an ordered snapshot and projection options.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub snapshot: CompanySnapshot,
    pub projection: Projection,
}

impl RenderContext {
    fn locale(&self) -> Locale {
        self.projection.locale
    }
}

pub type RenderFn = fn(&RenderContext) -> Result<Vec<u8>, RenderError>;

static RENDERERS: &[((ReportType, FileType), RenderFn)] = &[
    ((ReportType::Captable, FileType::Pdf), captable_pdf),
    ((ReportType::Captable, FileType::Xls), captable_xlsx),
    ((ReportType::AssemblyParticipation, FileType::Pdf), assembly_pdf),
    ((ReportType::AssemblyParticipation, FileType::Xls), assembly_xlsx),
    ((ReportType::VestedShares, FileType::Xls), vested_xlsx),
];

/// Find the renderer for a combination. A miss is a configuration error.
pub fn lookup(report_type: ReportType, file_type: FileType) -> Result<RenderFn, RenderError> {
    RENDERERS
        .iter()
        .find(|(key, _)| *key == (report_type, file_type))
        .map(|(_, render)| *render)
        .ok_or(RenderError::Unsupported {
            report_type,
            file_type,
        })
}

pub fn is_supported(report_type: ReportType, file_type: FileType) -> bool {
    lookup(report_type, file_type).is_ok()
}

const SHAREHOLDER_COLUMNS: &[Column] = &[
    Column::Number,
    Column::FirstName,
    Column::LastName,
    Column::Email,
    Column::ShareCount,
    Column::Percent,
    Column::Language,
];

const OPTION_HOLDER_COLUMNS: &[Column] = &[
    Column::Number,
    Column::FirstName,
    Column::LastName,
    Column::Email,
    Column::OptionCount,
    Column::Percent,
    Column::Language,
];

const PARTICIPANT_COLUMNS: &[Column] = &[
    Column::Number,
    Column::FirstName,
    Column::LastName,
    Column::ShareCount,
    Column::Percent,
    Column::Language,
    Column::Signature,
];

const VESTING_COLUMNS: &[Column] = &[
    Column::Number,
    Column::FirstName,
    Column::LastName,
    Column::Email,
    Column::OptionCount,
    Column::VestedCount,
    Column::Language,
];

fn document(ctx: &RenderContext, title: Label) -> ReportDocument {
    ReportDocument {
        title: title.text(ctx.locale()).to_string(),
        company: ctx.snapshot.company.name.clone(),
        as_of: ctx.snapshot.as_of,
        figures: company_figures(&ctx.snapshot, ctx.locale()),
        sheets: Vec::new(),
    }
}

fn captable_document(ctx: &RenderContext) -> ReportDocument {
    let mut doc = document(ctx, Label::Captable);
    doc.sheets = vec![
        ctx.projection.sheet(
            Label::Shareholders.text(ctx.locale()),
            SHAREHOLDER_COLUMNS,
            &ctx.snapshot.shareholders,
        ),
        ctx.projection.sheet(
            Label::OptionHolders.text(ctx.locale()),
            OPTION_HOLDER_COLUMNS,
            &ctx.snapshot.option_holders,
        ),
    ];
    doc
}

fn assembly_document(ctx: &RenderContext) -> ReportDocument {
    let mut doc = document(ctx, Label::AssemblyParticipation);
    doc.sheets = vec![ctx.projection.sheet(
        Label::Participants.text(ctx.locale()),
        PARTICIPANT_COLUMNS,
        &ctx.snapshot.shareholders,
    )];
    doc
}

fn vested_document(ctx: &RenderContext) -> ReportDocument {
    let mut doc = document(ctx, Label::VestedShares);
    doc.sheets = vec![ctx.projection.sheet(
        Label::OptionHolders.text(ctx.locale()),
        VESTING_COLUMNS,
        &ctx.snapshot.option_holders,
    )];
    doc
}

fn captable_pdf(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    write_pdf(&captable_document(ctx), Label::AsOf.text(ctx.locale()))
}

fn captable_xlsx(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    write_workbook(&captable_document(ctx))
}

fn assembly_pdf(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    write_pdf(&assembly_document(ctx), Label::AsOf.text(ctx.locale()))
}

fn assembly_xlsx(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    write_workbook(&assembly_document(ctx))
}

fn vested_xlsx(ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
    write_workbook(&vested_document(ctx))
}
