//! Validation
//!
//! Converts the array shapes accepted at the public surface into the canonical
//! representation used internally: an owned column-major feature matrix, a flat
//! target vector, and one group key per row for the sensitive features.
//!
//! Every rejection carries a fixed message so callers can match on it.
use crate::data::{ArrayLike, ColumnarMatrix, Matrix, OwnedMatrix};
use crate::errors::FairnessError;

/// Inputs after validation, all of the same length.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub x: OwnedMatrix,
    pub y: Option<Vec<f64>>,
    /// One key per row; multiple sensitive columns are compressed into one key.
    pub sensitive_features: Option<Vec<String>>,
}

/// Validate `X`, `y` and the sensitive features of a fit call.
///
/// * `expect_y` - Whether a missing `y` is an error.
/// * `enforce_binary_labels` - Whether `y` must only contain 0 and 1.
pub fn validate_and_reformat_input(
    x: Option<&ArrayLike>,
    y: Option<&ArrayLike>,
    sensitive_features: Option<&ArrayLike>,
    expect_y: bool,
    enforce_binary_labels: bool,
) -> Result<ValidatedInput, FairnessError> {
    let (x, y) = match y {
        Some(y) => {
            let x = validate_features(x.ok_or(FairnessError::XNone)?)?;
            let y = column_or_1d(y)?;
            check_consistent_length(&[x.rows, y.len()])?;
            if enforce_binary_labels && y.iter().any(|v| *v != 0.0 && *v != 1.0) {
                return Err(FairnessError::LabelsNotBinary);
            }
            (x, Some(y))
        }
        None if expect_y => return Err(FairnessError::YNone),
        None => (validate_features(x.ok_or(FairnessError::XNone)?)?, None),
    };

    let sensitive_features = match sensitive_features {
        Some(sf) => {
            check_consistent_length(&[x.rows, sf.n_rows()])?;
            Some(sensitive_feature_keys(sf)?)
        }
        None => None,
    };

    Ok(ValidatedInput {
        x,
        y,
        sensitive_features,
    })
}

/// Coerce a feature input into an owned, finite, 2-D column-major matrix.
pub fn validate_features(x: &ArrayLike) -> Result<OwnedMatrix, FairnessError> {
    let (rows, cols, data) = match x {
        ArrayLike::Matrix(m) => {
            check_matrix(m)?;
            (m.rows, m.cols, m.data.to_vec())
        }
        ArrayLike::Frame(f) => (f.rows, f.cols, frame_to_column_major(f)?),
        ArrayLike::Vector(_) => {
            return Err(FairnessError::InvalidInput(
                "Expected 2D array, got 1D array instead. Reshape your data either using \
                 array.reshape(-1, 1) if your data has a single feature or array.reshape(1, -1) \
                 if it contains a single sample."
                    .to_string(),
            ))
        }
        ArrayLike::Labels(_) | ArrayLike::LabelFrame(_) => return Err(string_to_float_error()),
    };
    if rows == 0 {
        return Err(FairnessError::NoSamples(cols));
    }
    if cols == 0 {
        return Err(FairnessError::InvalidInput(format!(
            "Found array with 0 feature(s) (shape=({}, 0)) while a minimum of 1 is required.",
            rows
        )));
    }
    assert_all_finite(&data)?;
    Ok(OwnedMatrix::new(data, rows, cols))
}

/// Flatten a target that is 1-D or has a single column.
fn column_or_1d(y: &ArrayLike) -> Result<Vec<f64>, FairnessError> {
    if let ArrayLike::Matrix(m) = y {
        check_matrix(m)?;
    }
    let values = match y {
        ArrayLike::Vector(v) => v.to_vec(),
        ArrayLike::Matrix(m) if m.cols == 1 => m.get_col(0).to_vec(),
        ArrayLike::Frame(f) if f.cols == 1 => frame_to_column_major(f)?,
        ArrayLike::Matrix(m) => return Err(FairnessError::BadInputShape(m.rows, m.cols)),
        ArrayLike::Frame(f) => return Err(FairnessError::BadInputShape(f.rows, f.cols)),
        ArrayLike::Labels(_) | ArrayLike::LabelFrame(_) => return Err(string_to_float_error()),
    };
    assert_all_finite(&values)?;
    Ok(values)
}

fn check_consistent_length(lengths: &[usize]) -> Result<(), FairnessError> {
    match lengths.first() {
        Some(first) if lengths.iter().any(|l| l != first) => {
            Err(FairnessError::InconsistentSamples(lengths.to_vec()))
        }
        _ => Ok(()),
    }
}

/// One string key per row. Multiple columns are joined with `,`,
/// escaping commas inside a value.
fn sensitive_feature_keys(sf: &ArrayLike) -> Result<Vec<String>, FairnessError> {
    let columns: Vec<Vec<String>> = match sf {
        ArrayLike::Vector(v) => vec![numeric_keys(v)?],
        ArrayLike::Labels(v) => vec![v.to_vec()],
        ArrayLike::Matrix(m) => {
            check_matrix(m)?;
            (0..m.cols)
                .map(|j| numeric_keys(m.get_col(j)))
                .collect::<Result<_, _>>()?
        }
        ArrayLike::Frame(f) => {
            check_frame(f)?;
            (0..f.cols)
                .map(|j| numeric_keys(f.get_col(j)))
                .collect::<Result<_, _>>()?
        }
        ArrayLike::LabelFrame(f) => {
            check_frame(f)?;
            (0..f.cols).map(|j| f.get_col(j).to_vec()).collect()
        }
    };
    let rows = sf.n_rows();
    match columns.len() {
        0 => Err(FairnessError::InvalidInput(
            "Sensitive features must have at least one column.".to_string(),
        )),
        1 => Ok(columns.into_iter().next().unwrap_or_default()),
        _ => Ok((0..rows)
            .map(|i| {
                columns
                    .iter()
                    .map(|col| col[i].replace(',', "\\,"))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect()),
    }
}

fn numeric_keys(values: &[f64]) -> Result<Vec<String>, FairnessError> {
    assert_all_finite(values)?;
    // Normalise -0.0 so it shares a group with 0.0.
    Ok(values
        .iter()
        .map(|v| if *v == 0.0 { 0.0_f64 } else { *v }.to_string())
        .collect())
}

/// The backing slice must hold exactly `rows * cols` values.
fn check_matrix(m: &Matrix<f64>) -> Result<(), FairnessError> {
    if m.rows.checked_mul(m.cols) != Some(m.data.len()) {
        return Err(FairnessError::InvalidInput(format!(
            "Matrix data of length {} does not match shape ({}, {}).",
            m.data.len(),
            m.rows,
            m.cols
        )));
    }
    Ok(())
}

/// Columns must agree in length and carry no nulls.
fn check_frame<T>(f: &ColumnarMatrix<T>) -> Result<(), FairnessError> {
    if f.columns.iter().any(|c| c.len() != f.rows) {
        return Err(FairnessError::InvalidInput(
            "All columns of a frame must have the same length.".to_string(),
        ));
    }
    for j in 0..f.cols {
        if (0..f.rows).any(|i| !f.is_valid(i, j)) {
            return Err(FairnessError::NotFinite);
        }
    }
    Ok(())
}

fn frame_to_column_major(f: &ColumnarMatrix<f64>) -> Result<Vec<f64>, FairnessError> {
    check_frame(f)?;
    let mut data = Vec::with_capacity(f.rows * f.cols);
    for col in &f.columns {
        data.extend_from_slice(col);
    }
    Ok(data)
}

fn assert_all_finite(values: &[f64]) -> Result<(), FairnessError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(FairnessError::NotFinite)
    }
}

fn string_to_float_error() -> FairnessError {
    FairnessError::InvalidInput("could not convert string to float".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EXPECTED_2D_ARRAY_MESSAGE, LABELS_NOT_0_1_ERROR_MESSAGE, MESSAGE_Y_NONE};

    fn x_data() -> Vec<f64> {
        vec![0., 1., 2., 3., 4., 5., 6., 7.]
    }

    #[test]
    fn test_valid_matrix_and_frame_agree() {
        let data = x_data();
        let y = vec![0., 1., 0., 1.];
        let a = vec![1., 1., 2., 2.];
        let xm = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let xf = ArrayLike::Frame(ColumnarMatrix::new(vec![&data[..4], &data[4..]], None));
        let from_matrix = validate_and_reformat_input(
            Some(&xm),
            Some(&ArrayLike::Vector(&y)),
            Some(&ArrayLike::Vector(&a)),
            true,
            true,
        )
        .unwrap();
        let from_frame = validate_and_reformat_input(
            Some(&xf),
            Some(&ArrayLike::Matrix(Matrix::new(&y, 4, 1))),
            Some(&ArrayLike::Vector(&a)),
            true,
            true,
        )
        .unwrap();
        assert_eq!(from_matrix.x, from_frame.x);
        assert_eq!(from_matrix.y, from_frame.y);
        assert_eq!(
            from_matrix.sensitive_features,
            Some(vec!["1".to_string(), "1".to_string(), "2".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn test_x_none() {
        let y = vec![0., 1.];
        let err =
            validate_and_reformat_input(None, Some(&ArrayLike::Vector(&y)), None, true, false).unwrap_err();
        assert_eq!(err.to_string(), EXPECTED_2D_ARRAY_MESSAGE);
        assert!(err.to_string().contains("Expected 2D array, got scalar array instead"));
    }

    #[test]
    fn test_y_none() {
        let data = x_data();
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let err = validate_and_reformat_input(Some(&x), None, None, true, false).unwrap_err();
        assert_eq!(err.to_string(), MESSAGE_Y_NONE);
        // Not required for prediction-style validation.
        assert!(validate_and_reformat_input(Some(&x), None, None, false, false).is_ok());
    }

    #[test]
    fn test_y_bad_columns() {
        let data = x_data();
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let y2 = vec![0., 1., 0., 1., 0., 1., 0., 1.];
        let err = validate_and_reformat_input(
            Some(&x),
            Some(&ArrayLike::Matrix(Matrix::new(&y2, 4, 2))),
            None,
            true,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad input shape"));
        assert_eq!(err.to_string(), "bad input shape (4, 2)");
    }

    #[test]
    fn test_labels_not_binary() {
        let data = x_data();
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let y = vec![0., 1., 2., 1.];
        let err = validate_and_reformat_input(Some(&x), Some(&ArrayLike::Vector(&y)), None, true, true)
            .unwrap_err();
        assert_eq!(err.to_string(), LABELS_NOT_0_1_ERROR_MESSAGE);
        // Regression targets are not restricted.
        assert!(validate_and_reformat_input(Some(&x), Some(&ArrayLike::Vector(&y)), None, true, false).is_ok());
    }

    #[test]
    fn test_inconsistent_samples() {
        let data = x_data();
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let y = vec![0., 1., 0., 1., 1.];
        let err = validate_and_reformat_input(Some(&x), Some(&ArrayLike::Vector(&y)), None, true, false)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("Found input variables with inconsistent numbers of samples"));

        let y = vec![0., 1., 0., 1.];
        let a = vec![0., 1., 0.];
        let err = validate_and_reformat_input(
            Some(&x),
            Some(&ArrayLike::Vector(&y)),
            Some(&ArrayLike::Vector(&a)),
            true,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Found input variables with inconsistent numbers of samples: [4, 3]"
        );
    }

    #[test]
    fn test_multi_column_sensitive_features_are_compressed() {
        let race = vec!["a".to_string(), "b,c".to_string(), "a".to_string()];
        let sex = vec!["f".to_string(), "m".to_string(), "m".to_string()];
        let frame = ColumnarMatrix::new(vec![race.as_slice(), sex.as_slice()], None);
        let keys = sensitive_feature_keys(&ArrayLike::LabelFrame(frame)).unwrap();
        assert_eq!(keys, vec!["a,f", "b\\,c,m", "a,m"]);

        let numeric = vec![0., 1., -0., 2., 2., 2.];
        let keys = sensitive_feature_keys(&ArrayLike::Matrix(Matrix::new(&numeric, 3, 2))).unwrap();
        assert_eq!(keys, vec!["0,2", "1,2", "0,2"]);
    }

    #[test]
    fn test_non_finite_and_nulls() {
        let data = vec![0., f64::NAN, 2., 3.];
        let y = vec![0., 1., 0., 1.];
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 1));
        let err = validate_and_reformat_input(Some(&x), Some(&ArrayLike::Vector(&y)), None, true, false)
            .unwrap_err();
        assert!(matches!(err, FairnessError::NotFinite));

        let col = vec![0., 1., 2., 3.];
        let mask: Vec<u8> = vec![0b0000_1011];
        let frame = ColumnarMatrix::new(vec![col.as_slice()], Some(vec![Some(mask.as_slice())]));
        assert!(matches!(
            validate_features(&ArrayLike::Frame(frame)),
            Err(FairnessError::NotFinite)
        ));
    }

    #[test]
    fn test_short_matrix_data() {
        let data = x_data();
        let x = ArrayLike::Matrix(Matrix::new(&data, 4, 2));
        let short_y = vec![0., 1.];
        let err = validate_and_reformat_input(
            Some(&x),
            Some(&ArrayLike::Matrix(Matrix::new(&short_y, 4, 1))),
            None,
            true,
            true,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Matrix data of length 2 does not match shape (4, 1).");

        let y = vec![0., 1., 0., 1.];
        let short_a = vec![0., 1., 1.];
        let err = validate_and_reformat_input(
            Some(&x),
            Some(&ArrayLike::Vector(&y)),
            Some(&ArrayLike::Matrix(Matrix::new(&short_a, 4, 2))),
            true,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, FairnessError::InvalidInput(_)));

        assert!(matches!(
            validate_features(&ArrayLike::Matrix(Matrix::new(&data, 5, 2))),
            Err(FairnessError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_feature_shapes() {
        let v = vec![1., 2.];
        assert!(matches!(
            validate_features(&ArrayLike::Vector(&v)),
            Err(FairnessError::InvalidInput(_))
        ));
        let empty: Vec<f64> = Vec::new();
        assert!(matches!(
            validate_features(&ArrayLike::Matrix(Matrix::new(&empty, 0, 3))),
            Err(FairnessError::NoSamples(3))
        ));
        let labels = vec!["a".to_string()];
        assert!(validate_features(&ArrayLike::Labels(&labels)).is_err());
    }
}
