use crate::errors::AuthError;

const ENV_SCHEME: &str = "env:";

/// Resolve an `env:<VARIABLE>` reference to the secret it points at.
pub fn resolve_reference(owner: &str, reference: Option<&str>) -> Result<String, AuthError> {
    let reference = reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AuthError::MissingReference {
            model_id: owner.to_string(),
        })?;

    let variable = reference
        .strip_prefix(ENV_SCHEME)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::UnsupportedReference {
            model_id: owner.to_string(),
            reference: reference.to_string(),
        })?;

    match std::env::var(variable) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::MissingVariable {
            model_id: owner.to_string(),
            variable: variable.to_string(),
        }),
    }
}
