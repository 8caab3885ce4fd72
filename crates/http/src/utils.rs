/// Returns early with `Err($error)` when `$predicate` does not hold.
///
/// ```ignore
/// ensure!(count <= MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
