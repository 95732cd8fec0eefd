//! Configuration validation
//!
//! Rules:
//! - endpoint is an http(s) URL
//! - timeout_secs >= 1 when set
//! - field names and commands are not empty

use contracts::{ContractError, RelayBlueprint};
use ::validator::Validate;

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_derived(blueprint)?;
    validate_endpoint_scheme(blueprint)?;
    validate_field_mapping(blueprint)?;
    Ok(())
}

/// Run the declarative field rules
fn validate_derived(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let errors = match blueprint.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, details)) => {
            let message = details
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("failed '{}' check", e.code),
                })
                .collect::<Vec<_>>()
                .join(", ");
            Err(ContractError::config_validation(field.to_string(), message))
        }
        None => Err(ContractError::config_validation("<root>", errors.to_string())),
    }
}

/// Only plain HTTP(S) endpoints can receive PUT requests
fn validate_endpoint_scheme(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let endpoint = blueprint.endpoint.trim().to_ascii_lowercase();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(());
    }
    Err(ContractError::config_validation(
        "endpoint",
        format!("endpoint must use http or https, got '{}'", blueprint.endpoint),
    ))
}

/// Validate field mapping entries
fn validate_field_mapping(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut names: Vec<_> = blueprint.field_mapping.iter().collect();
    names.sort();

    for (name, command) in names {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                "field_mapping",
                "field name cannot be empty",
            ));
        }
        if command.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("field_mapping.{}", name),
                "command cannot be empty",
            ));
        }
    }
    Ok(())
}
