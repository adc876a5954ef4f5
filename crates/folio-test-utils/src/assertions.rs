//! Assertion macros for `Result` values.

/// Assert that a result is Ok and extract the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a result is Err and extract the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => panic!("{}: {:?}", $msg, value),
            Err(e) => e,
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_extract_values() {
        let ok: Result<u32, String> = Ok(7);
        assert_eq!(crate::assert_ok!(ok), 7);

        let err: Result<u32, String> = Err("boom".to_string());
        assert_eq!(crate::assert_err!(err, "should fail"), "boom");
    }

    #[test]
    #[should_panic(expected = "Expected Err")]
    fn assert_err_panics_on_ok() {
        let ok: Result<u32, String> = Ok(1);
        crate::assert_err!(ok);
    }
}
