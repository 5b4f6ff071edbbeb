//! HTML rendering of the report context
//!
//! One embedded template, rendered from the serializable [`ReportContext`].
//! The core emits plain structured data; everything visual lives in the
//! template.

use anyhow::{Context as _, Result};
use tera::{Context, Tera};

use crate::report::ReportContext;

const INDEX_TEMPLATE: &str = include_str!("index.html");
const TEMPLATE_NAME: &str = "index.html";

/// Render the single-page report.
pub fn render_index(report: &ReportContext) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, INDEX_TEMPLATE)
        .context("embedded report template is invalid")?;
    let context =
        Context::from_serialize(report).context("unable to serialize report context")?;
    tera.render(TEMPLATE_NAME, &context)
        .context("unable to render report")
}
