//! Note composition: person + optional company → short plain-text summary.
//!
//! ```text
//! CEO @ Clearbit
//! Raised $17M, 150 employees
//! ```

use noterelay_shared::{Company, MetricValue, Person, RelayError, Result};
use tracing::debug;

use crate::magnitude::format_magnitude;

/// Compose the note for a person and, if the lookup produced one, their company.
///
/// Lines without data are left out, so the result may be empty. An empty
/// company record is treated as no company. A person without an `employment`
/// object, or a non-empty company without `metrics`, is a shape the relay
/// cannot describe and yields [`RelayError::NoteGeneration`].
pub fn compose_note(person: &Person, company: Option<&Company>) -> Result<String> {
    let employment = person
        .employment
        .as_ref()
        .ok_or_else(|| RelayError::note("person record has no employment object"))?;

    let mut lines: Vec<String> = Vec::with_capacity(2);

    let title = non_empty(employment.title.as_deref());
    let name = non_empty(employment.name.as_deref());

    match (title, name) {
        (Some(title), Some(name)) => lines.push(format!("{title} @ {name}")),
        (None, Some(name)) => lines.push(format!("Works @ {name}")),
        _ => {}
    }

    if let Some(company) = company.filter(|c| !c.is_empty()) {
        let metrics = company
            .metrics
            .as_ref()
            .ok_or_else(|| RelayError::note("company record has no metrics object"))?;

        let raised = present(metrics.raised.as_ref()).map(display_metric);
        let employees = present(metrics.employees.as_ref()).map(display_metric);

        match (raised, employees) {
            (Some(raised), Some(employees)) => {
                lines.push(format!("Raised ${raised}, {employees} employees"))
            }
            (Some(raised), None) => lines.push(format!("Raised ${raised}")),
            (None, Some(employees)) => lines.push(format!("{employees} employees")),
            (None, None) => {}
        }
    }

    Ok(lines.join("\n").trim().to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn present(value: Option<&MetricValue>) -> Option<&MetricValue> {
    value.filter(|v| v.is_present())
}

/// Compact form of a metric, or the value as delivered if it cannot be formatted.
fn display_metric(value: &MetricValue) -> String {
    value
        .as_f64()
        .ok_or_else(|| RelayError::validation(format!("metric {value} is not numeric")))
        .and_then(format_magnitude)
        .unwrap_or_else(|e| {
            debug!(error = %e, "keeping raw metric value");
            value.to_string()
        })
}
