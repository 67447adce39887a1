use super::FormulaError;
use ariadne::{Config, Label, Report, ReportKind, Source};

/// Render formula errors as plain-text ariadne reports.
///
/// Errors without a location (empty formula, non-finite result) point at the
/// whole formula.
pub fn render_formula_errors(
    label: &str,
    formula: &str,
    errors: &[FormulaError],
) -> std::io::Result<String> {
    let mut report_bytes = Vec::new();
    for error in errors {
        let span = error.span().unwrap_or(0..formula.len());
        let reason = match error {
            FormulaError::Syntax { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        Report::build(ReportKind::Error, (label, span.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(error.to_string())
            .with_label(Label::new((label, span)).with_message(reason))
            .finish()
            .write((label, Source::from(formula)), &mut report_bytes)?;
    }
    Ok(String::from_utf8_lossy(&report_bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    #[test]
    fn test_report_names_the_formula() {
        let errors = parse_formula("length * ;").unwrap_err();
        let report = render_formula_errors("area", "length * ;", &errors).unwrap();
        assert!(report.contains("area"));
        assert!(report.contains("Error"));
    }
}
