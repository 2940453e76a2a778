//! Yearly ledger as CSV

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use super::ModelResult;
use crate::assumptions::Segment;
use crate::error::Result;

const SEGMENT_COLUMNS: [&str; 5] = ["Units", "Students", "Revenue", "EBITDA", "Capex"];

fn header() -> Vec<String> {
    let mut columns = vec!["Period".to_string(), "Year".to_string()];
    for segment in Segment::ALL {
        for column in SEGMENT_COLUMNS {
            columns.push(format!("{segment}{column}"));
        }
    }
    columns.extend(
        [
            "TotalStudents",
            "TotalRevenue",
            "TotalEBITDA",
            "TotalCapex",
            "NetCashFlow",
            "CumulativeCashFlow",
            "CumulativeCapex",
            "Timeback",
            "EBITDAMargin",
            "TimebackPct",
        ]
        .map(String::from),
    );
    columns
}

/// Write one row per period to `writer`
pub fn write_ledger<W: Write>(writer: W, result: &ModelResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header())?;

    for year in &result.years {
        let mut record = vec![year.period.to_string(), year.label.clone()];
        for s in &year.segments {
            record.push(s.units.to_string());
            record.push(s.students.to_string());
            record.push(format!("{:.2}", s.revenue));
            record.push(format!("{:.2}", s.ebitda));
            record.push(format!("{:.2}", s.capex));
        }
        record.push(year.total_students.to_string());
        record.push(format!("{:.2}", year.total_revenue));
        record.push(format!("{:.2}", year.total_ebitda));
        record.push(format!("{:.2}", year.total_capex));
        record.push(format!("{:.2}", year.net_cash_flow));
        record.push(format!("{:.2}", year.cumulative_cash_flow));
        record.push(format!("{:.2}", year.cumulative_capex));
        record.push(format!("{:.2}", year.total_timeback));
        record.push(format!("{:.6}", year.ebitda_margin));
        record.push(format!("{:.6}", year.timeback_pct));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the ledger to a file
pub fn write_ledger_to_path<P: AsRef<Path>>(path: P, result: &ModelResult) -> Result<()> {
    let path = path.as_ref();
    write_ledger(File::create(path)?, result)?;
    info!("Ledger written to {}", path.display());
    Ok(())
}
