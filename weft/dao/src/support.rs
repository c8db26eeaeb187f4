//! Helpers for extracting a single value out of a query result.

use crate::error::{DataAccessError, DataAccessResult};

/// Returns the first element of at most one result.
///
/// Fails with [`IncorrectResultSize`] when more than one element is found.
///
/// [`IncorrectResultSize`]: crate::DataAccessErrorKind::IncorrectResultSize
pub fn single_result<T>(results: Vec<T>) -> DataAccessResult<Option<T>> {
    match results.len() {
        0 | 1 => Ok(results.into_iter().next()),
        n => Err(DataAccessError::incorrect_result_size(1, n)),
    }
}

/// Like [`single_result`] but an empty result is an error too.
pub fn required_single_result<T>(results: Vec<T>) -> DataAccessResult<T> {
    single_result(results)?.ok_or_else(|| DataAccessError::empty_result(1))
}

/// Returns the single distinct value of the result.
///
/// Several elements that are all equal count as one.
pub fn unique_result<T: PartialEq>(results: Vec<T>) -> DataAccessResult<Option<T>> {
    let actual = results.len();
    let mut iter = results.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    if iter.any(|other| other != first) {
        return Err(DataAccessError::incorrect_result_size(1, actual));
    }
    Ok(Some(first))
}

pub fn required_unique_result<T: PartialEq>(results: Vec<T>) -> DataAccessResult<T> {
    unique_result(results)?.ok_or_else(|| DataAccessError::empty_result(1))
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::error::DataAccessErrorKind;

    #[test]
    fn test_single_result() {
        assert_eq!(single_result::<i32>(vec![]).unwrap(), None);
        assert_eq!(single_result(vec![4]).unwrap(), Some(4));
        assert_eq!(
            single_result(vec![4, 4]).unwrap_err().kind(),
            DataAccessErrorKind::IncorrectResultSize {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_required_single_result() {
        assert_eq!(required_single_result(vec!["a"]).unwrap(), "a");
        let err = required_single_result::<&str>(vec![]).unwrap_err();
        assert_snapshot!(
            err.to_string(),
            @"incorrect result size: expected 1, actual 0: query returned no result"
        );
    }

    #[test]
    fn test_unique_result() {
        assert_eq!(unique_result::<u8>(vec![]).unwrap(), None);
        assert_eq!(unique_result(vec![3, 3, 3]).unwrap(), Some(3));
        assert_eq!(
            unique_result(vec![3, 3, 5]).unwrap_err().kind(),
            DataAccessErrorKind::IncorrectResultSize {
                expected: 1,
                actual: 3
            }
        );
    }

    #[test]
    fn test_required_unique_result() {
        assert_eq!(required_unique_result(vec![7, 7]).unwrap(), 7);
        assert_eq!(
            required_unique_result::<u8>(vec![]).unwrap_err().kind(),
            DataAccessErrorKind::EmptyResult { expected: 1 }
        );
    }
}
