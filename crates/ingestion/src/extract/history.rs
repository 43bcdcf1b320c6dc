//! `HISTORY_*` records of metadata and trajectory files.
//!
//! Both layouts put one entry per `N_HISTORY` row. Rows that name no
//! institution, step, software or action are padding and are skipped.

use argo_common::HistoryEntry;

use super::fields::{number_at, string_at, Fields};
use crate::error::Result;

pub(crate) fn history(f: &Fields<'_>) -> Result<Vec<HistoryEntry>> {
    let Some(n) = f.optional_dimension("N_HISTORY") else {
        return Ok(Vec::new());
    };
    if n == 0 || f.strings("HISTORY_INSTITUTION", n)?.is_none() {
        return Ok(Vec::new());
    }

    let text = |name: &str| f.strings(name, n);
    let institution = text("HISTORY_INSTITUTION")?;
    let step = text("HISTORY_STEP")?;
    let software = text("HISTORY_SOFTWARE")?;
    let software_release = text("HISTORY_SOFTWARE_RELEASE")?;
    let reference = text("HISTORY_REFERENCE")?;
    let action = text("HISTORY_ACTION")?;
    let parameter = text("HISTORY_PARAMETER")?;
    let qctest = text("HISTORY_QCTEST")?;
    let dates = f.dates("HISTORY_DATE", n)?;
    let start_pres = f.numbers("HISTORY_START_PRES", n)?;
    let stop_pres = f.numbers("HISTORY_STOP_PRES", n)?;
    let previous_value = f.numbers("HISTORY_PREVIOUS_VALUE", n)?;

    Ok((0..n)
        .map(|i| HistoryEntry {
            institution: string_at(&institution, i),
            step: string_at(&step, i),
            software: string_at(&software, i),
            software_release: string_at(&software_release, i),
            reference: string_at(&reference, i),
            date: dates.as_ref().and_then(|d| d.get(i).copied().flatten()),
            action: string_at(&action, i),
            parameter: string_at(&parameter, i),
            start_pres: number_at(&start_pres, i),
            stop_pres: number_at(&stop_pres, i),
            previous_value: number_at(&previous_value, i),
            qctest: string_at(&qctest, i),
        })
        .filter(|h| {
            h.institution.is_some() || h.step.is_some() || h.software.is_some() || h.action.is_some()
        })
        .collect())
}
