//! IP2Location-style range CSV reader
//!
//! Rows look like `"16777216","16777471","AU","Australia"`: no header,
//! numeric bounds, then code and name. Any bad row fails the whole read.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::analytics::models::IpRange;
use crate::error::{Error, Result};

/// Parse every row of a range dataset
pub fn read_ranges<R: Read>(reader: R) -> Result<Vec<IpRange>> {
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut ranges = Vec::new();

    for (idx, record) in csv.records().enumerate() {
        let row = idx as u64 + 1;
        let record = record.map_err(|e| csv_error(row, e))?;
        ranges.push(parse_row(row, &record)?);
    }

    Ok(ranges)
}

pub fn read_ranges_file(path: &Path) -> Result<Vec<IpRange>> {
    let file = File::open(path)?;
    read_ranges(BufReader::new(file))
}

fn parse_row(row: u64, record: &StringRecord) -> Result<IpRange> {
    let field = |idx: usize, name: &str| {
        record.get(idx).ok_or_else(|| Error::DataFormat {
            row,
            reason: format!("missing {name} column"),
        })
    };

    let bound = |idx: usize, name: &str| -> Result<u32> {
        let raw = field(idx, name)?;
        raw.parse::<u32>().map_err(|_| Error::DataFormat {
            row,
            reason: format!("{name} bound {raw:?} is not an IPv4 integer"),
        })
    };

    Ok(IpRange {
        from_ip: bound(0, "from")?,
        to_ip: bound(1, "to")?,
        country_code: field(2, "country code")?.to_string(),
        country_name: field(3, "country name")?.to_string(),
    })
}

fn csv_error(row: u64, err: csv::Error) -> Error {
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        _ => Error::DataFormat { row, reason },
    }
}
