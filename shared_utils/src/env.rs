use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables. A variable that is
/// set but not valid unicode is reported as missing.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Reads an environment variable, falling back to `default` when it is not set.
///
/// The fallback is logged at debug level so a run can be audited without
/// printing the value itself.
pub fn get_env_var_or(name: &str, default: &str) -> String {
    match get_env_var(name) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(var = name, "{e}; using fallback value");
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VAR: &str = "SHARED_UTILS_TEST_VAR";

    #[test]
    #[serial]
    fn missing_var_is_a_structured_error() {
        // SAFETY: serialised with the other env tests in this module.
        unsafe { std::env::remove_var(VAR) };
        let err = get_env_var(VAR).unwrap_err();
        assert_eq!(err.0, VAR);
        assert_eq!(err.to_string(), format!("Missing environment variable: {VAR}"));
    }

    #[test]
    #[serial]
    fn fallback_used_only_when_unset() {
        unsafe { std::env::remove_var(VAR) };
        assert_eq!(get_env_var_or(VAR, "placeholder"), "placeholder");

        unsafe { std::env::set_var(VAR, "real") };
        assert_eq!(get_env_var_or(VAR, "placeholder"), "real");
        unsafe { std::env::remove_var(VAR) };
    }
}
