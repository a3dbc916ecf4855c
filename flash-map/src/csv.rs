use std::path::Path;

use csv::Writer;
use serde::Serialize;

use crate::error::Error;
use crate::FlashMap;

/// One CSV row per partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionRow {
    pub label: &'static str,
    pub chip: &'static str,
    pub first_sector: u16,
    pub last_sector: u16,
    pub offset: u32,
    pub size: u32,
}

pub(crate) fn write_csv<P: AsRef<Path>>(map: &FlashMap, output_path: P) -> Result<(), Error> {
    let mut wtr = Writer::from_path(output_path)?;
    write_records(&mut wtr, map)
}

pub(crate) fn write_csv_content(map: &FlashMap) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, map)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidValue(format!("CSV output is not valid UTF-8: {}", e)))
}

fn write_records<W: std::io::Write>(wtr: &mut Writer<W>, map: &FlashMap) -> Result<(), Error> {
    // serialize() emits the header from the first row's field names
    for row in map.rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
