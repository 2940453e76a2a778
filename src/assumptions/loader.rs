//! Load an assumption book from JSON
//!
//! The baked-in book is used unless a file overrides it. A loaded book is
//! validated before it is handed back.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::info;

use super::AssumptionBook;
use crate::error::Result;

/// Load and validate an assumption book from a JSON file
pub fn load_assumptions<P: AsRef<Path>>(path: P) -> Result<AssumptionBook> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let book = load_assumptions_from_reader(BufReader::new(file))?;
    info!("Loaded assumptions from {}", path.display());
    Ok(book)
}

/// Load and validate an assumption book from any reader
pub fn load_assumptions_from_reader<R: Read>(reader: R) -> Result<AssumptionBook> {
    let book: AssumptionBook = serde_json::from_reader(reader)?;
    book.validate()?;
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{CapitalCost, Segment};
    use crate::error::ModelError;

    #[test]
    fn test_default_book_loads_from_json() {
        let book = AssumptionBook::default();
        let json = serde_json::to_string(&book).unwrap();

        let loaded = load_assumptions_from_reader(json.as_bytes()).unwrap();
        assert_eq!(loaded.micro.initial_units, 6);
        assert_eq!(loaded.mid_sized.fill_rates.len(), 4);
        assert_eq!(loaded.virtual_school.tuition, 10_474.0);
        assert!(matches!(
            loaded.get(Segment::Flagship).facility.as_ref().map(|f| &f.capital),
            Some(CapitalCost::PerUnitParameter)
        ));
    }

    #[test]
    fn test_invalid_book_is_rejected() {
        let mut book = AssumptionBook::default();
        book.micro.organic_churn = 1.5;
        let json = serde_json::to_string(&book).unwrap();

        let err = load_assumptions_from_reader(json.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidAssumption { segment: Segment::Micro, .. }
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = load_assumptions_from_reader("{ not json".as_bytes()).unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }
}
