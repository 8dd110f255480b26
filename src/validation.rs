//! Input validation for a loaded scope.
//!
//! Checks structural integrity of the classes and locked placements
//! before the validity matrix is built. Detects:
//! - Duplicate class IDs
//! - Two classes for the same (course, section, year, semester, department)
//! - Classes that belong to a different scope
//! - Locked placements outside the weekly grid or for unknown classes

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{ClassSection, Placement, Scope};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two classes share the same ID.
    DuplicateId,
    /// Two classes share the same natural key.
    DuplicateClass,
    /// A class belongs to another scope.
    ForeignClass,
    /// A locked placement lies outside days 1..=6 / slots 1..=8.
    PositionOutOfRange,
    /// A locked placement references a class not in the scope.
    UnknownClass,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the classes and locked placements loaded for `scope`.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_scope_input(
    scope: &Scope,
    classes: &[Arc<ClassSection>],
    locked: &[Placement],
) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    let mut keys = HashSet::new();

    for class in classes {
        if !ids.insert(class.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate class ID: {}", class.id),
            ));
        }
        if !keys.insert(class.natural_key()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateClass,
                format!(
                    "Course '{}' has more than one class for section '{}'",
                    class.course.id,
                    class.section()
                ),
            ));
        }
        if class.scope != *scope {
            errors.push(ValidationError::new(
                ValidationErrorKind::ForeignClass,
                format!("{} belongs to scope {}, not {scope}", class.id, class.scope),
            ));
        }
    }

    for p in locked {
        if !p.position.is_valid() {
            errors.push(ValidationError::new(
                ValidationErrorKind::PositionOutOfRange,
                format!("Locked placement of {} at {} is off the grid", p.class_id(), p.position),
            ));
        }
        if !ids.contains(&p.class_id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownClass,
                format!("Locked placement references unknown {}", p.class_id()),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
