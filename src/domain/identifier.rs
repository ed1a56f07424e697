//! Composite resource identifiers
//!
//! An identifier is the kind tag followed by the natural-key fields, joined
//! with `$`. Resource names routinely contain `-`, so `$` is the separator.

use crate::domain::ports::ResourceKind;
use crate::error::{Error, Result};

/// Field separator
pub const DELIMITER: char = '$';

/// Build the identifier for `kind` from its natural-key fields
pub fn build_id(kind: ResourceKind, fields: &[&str]) -> Result<String> {
    if fields.len() + 1 != kind.arity() {
        return Err(Error::Internal(format!(
            "{} identifiers take {} key fields, got {}",
            kind,
            kind.arity() - 1,
            fields.len()
        )));
    }

    for field in fields {
        check_field(kind, field)?;
    }

    let mut id = String::from(kind.tag());
    for field in fields {
        id.push(DELIMITER);
        id.push_str(field);
    }
    Ok(id)
}

/// Split `id` back into its natural-key fields, tag excluded.
///
/// Rejects anything that was not produced by [`build_id`] for the same kind.
pub fn parse_id(kind: ResourceKind, id: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = id.split(DELIMITER).collect();

    if parts.len() != kind.arity() {
        return Err(Error::MalformedIdentifier {
            kind: kind.tag().to_string(),
            id: id.to_string(),
            expected: kind.arity(),
            found: parts.len(),
        });
    }

    if parts[0] != kind.tag() {
        return Err(Error::InvalidIdentifierField {
            kind: kind.tag().to_string(),
            field: parts[0].to_string(),
            reason: format!("expected tag '{}'", kind.tag()),
        });
    }

    let fields = &parts[1..];
    for field in fields {
        check_field(kind, field)?;
    }

    Ok(fields.iter().map(|f| f.to_string()).collect())
}

fn check_field(kind: ResourceKind, field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(Error::InvalidIdentifierField {
            kind: kind.tag().to_string(),
            field: String::new(),
            reason: "empty key field".into(),
        });
    }
    if field.contains(DELIMITER) {
        return Err(Error::InvalidIdentifierField {
            kind: kind.tag().to_string(),
            field: field.to_string(),
            reason: format!("contains the '{}' delimiter", DELIMITER),
        });
    }
    Ok(())
}
