//! Loading of headerless numeric CSV files into graph leaves.
//!
//! Features become one leaf per field, targets take the first field of each
//! record. The loader does not check that features and targets line up; the
//! trainer does.

use crate::{
    engine::{from_f64, ComputationGraph},
    error::{Error, Result},
};
use csv::{ReaderBuilder, Trim};
use daggy::NodeIndex;
use num_traits::Float;
use std::{fmt, fs::File, io::Read, path::Path};
use tracing::debug;

/// Parses every record of `reader` as a row of floats. Rows and columns in
/// errors are 1-based.
pub fn rows_from_reader<R: Read>(reader: R) -> Result<Vec<Vec<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .enumerate()
            .map(|(j, field)| {
                field.parse::<f64>().map_err(|_| Error::Parse {
                    row: i + 1,
                    column: j + 1,
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Reads a CSV file into rows of floats. An empty file is an error.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let rows = rows_from_reader(file)?;
    if rows.is_empty() {
        return Err(Error::EmptyDataset {
            path: path.to_path_buf(),
        });
    }
    debug!(?path, rows = rows.len(), "read csv");
    Ok(rows)
}

/// Feature matrix: one leaf per field.
pub fn load_features<T, P>(path: P, cg: &mut ComputationGraph<T>) -> Result<Vec<Vec<NodeIndex>>>
where
    T: Float + fmt::Display,
    P: AsRef<Path>,
{
    let rows = read_rows(path)?;
    Ok(rows
        .iter()
        .map(|row| row.iter().map(|&v| cg.new_value(from_f64(v))).collect())
        .collect())
}

/// Target column: the first field of every record.
pub fn load_targets<T, P>(path: P, cg: &mut ComputationGraph<T>) -> Result<Vec<NodeIndex>>
where
    T: Float + fmt::Display,
    P: AsRef<Path>,
{
    let rows = read_rows(path)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.first() {
            Some(&v) => Ok(cg.new_value(from_f64(v))),
            None => Err(Error::Parse {
                row: i + 1,
                column: 1,
                value: String::new(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parses_rows() {
        let rows = rows_from_reader("1,2.5,-3\n4, 5e-1 ,6\n".as_bytes()).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.5, -3.0], vec![4.0, 0.5, 6.0]]);
    }

    #[test]
    fn bad_field_reports_position() {
        let err = rows_from_reader("1,2\n3,abc\n".as_bytes()).unwrap_err();
        match err {
            Error::Parse { row, column, value } => {
                assert_eq!((row, column), (2, 2));
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let err = rows_from_reader("1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut cg = ComputationGraph::<f64>::new();
        let err = load_features("/nonexistent/gradnet/features.csv", &mut cg).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(cg.node_count(), 0);
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = csv_file("");
        assert!(matches!(
            read_rows(file.path()),
            Err(Error::EmptyDataset { .. })
        ));
    }

    #[test]
    fn features_become_leaves() {
        let file = csv_file("1,2\n3,4\n5,6\n");
        let mut cg = ComputationGraph::<f64>::new();
        let xs = load_features(file.path(), &mut cg).unwrap();
        assert_eq!(xs.len(), 3);
        assert_eq!(xs[0].len(), 2);
        assert_eq!(cg.data(xs[2][1]), 6.0);
        assert!(cg.value(xs[1][0]).is_leaf());
    }

    #[test]
    fn targets_take_first_column() {
        let file = csv_file("0.5,9\n1.5,9\n");
        let mut cg = ComputationGraph::<f64>::new();
        let ys = load_targets(file.path(), &mut cg).unwrap();
        let values: Vec<f64> = ys.iter().map(|&y| cg.data(y)).collect();
        assert_eq!(values, vec![0.5, 1.5]);
    }

    #[test]
    fn parse_error_surfaces_from_loader() {
        let file = csv_file("1.0\nnot-a-number\n");
        let mut cg = ComputationGraph::<f64>::new();
        assert!(matches!(
            load_targets(file.path(), &mut cg),
            Err(Error::Parse { row: 2, column: 1, .. })
        ));
    }
}
