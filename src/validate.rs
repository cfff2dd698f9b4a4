//! Local validation of drawer fields before anything reaches the gateway.
//!
//! Validation is pure: the same form always yields the same errors, and an
//! empty result means the form may be submitted.

use crate::drawer::{DrawerForm, field};
use crate::gateway::FieldError;

const LABEL_BLANK: &str = "Label cannot be blank.";
const SIZE_BLANK: &str = "Size cannot be blank.";
const SIZE_NOT_POSITIVE: &str = "Size must be a positive integer.";
const VOLUME_BLANK: &str = "Volume cannot be blank.";

/// Checks `form` for missing or malformed fields.
#[must_use]
pub fn validate(form: &DrawerForm) -> Vec<FieldError> {
    let mut errors = Vec::new();
    match form {
        DrawerForm::Create(create) => {
            check_label(field::LABEL, &create.label, &mut errors);
            check_size(&create.size, &mut errors);
        }
        DrawerForm::Edit(edit) => check_label(field::LABEL, &edit.label, &mut errors),
        DrawerForm::Resize(resize) => check_size(&resize.size, &mut errors),
        DrawerForm::Clone(clone) => check_label(field::CLONE_LABEL, &clone.clone_label, &mut errors),
        DrawerForm::Attach(attach) => {
            if attach.selected.is_none() {
                errors.push(FieldError::new(field::VOLUME, VOLUME_BLANK));
            }
        }
    }
    errors
}

/// Parses a raw size input into a positive number of GiB.
///
/// Returns `None` for blank, non-numeric, zero or out-of-range input.
#[must_use]
pub fn parse_size(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|size| *size > 0)
}

fn check_label(key: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(key, LABEL_BLANK));
    }
}

fn check_size(raw: &str, errors: &mut Vec<FieldError>) {
    if raw.trim().is_empty() {
        errors.push(FieldError::new(field::SIZE, SIZE_BLANK));
    } else if parse_size(raw).is_none() {
        errors.push(FieldError::new(field::SIZE, SIZE_NOT_POSITIVE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawer::{AttachForm, CloneForm, CreateForm, EditForm, ResizeForm};
    use crate::volume::{ParentId, VolumeId};
    use rstest::rstest;

    fn create(label: &str, size: &str) -> DrawerForm {
        DrawerForm::Create(CreateForm {
            label: label.to_owned(),
            size: size.to_owned(),
            region: String::from("us-east"),
            parent_id: ParentId(1),
        })
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|error| error.field.as_str()).collect()
    }

    #[test]
    fn create_with_empty_label_reports_only_label() {
        let errors = validate(&create("", "20"));
        assert_eq!(errors, vec![FieldError::new("label", LABEL_BLANK)]);
    }

    #[test]
    fn create_reports_every_problem() {
        let errors = validate(&create("  ", "0"));
        assert_eq!(fields(&errors), vec!["label", "size"]);
    }

    #[rstest]
    #[case("", Some(SIZE_BLANK))]
    #[case("   ", Some(SIZE_BLANK))]
    #[case("0", Some(SIZE_NOT_POSITIVE))]
    #[case("-4", Some(SIZE_NOT_POSITIVE))]
    #[case("1.5", Some(SIZE_NOT_POSITIVE))]
    #[case("ten", Some(SIZE_NOT_POSITIVE))]
    #[case("40", None)]
    #[case(" 40 ", None)]
    fn resize_size_rules(#[case] size: &str, #[case] expected: Option<&str>) {
        let form = DrawerForm::Resize(ResizeForm {
            id: VolumeId(1),
            label: String::from("data"),
            size: size.to_owned(),
        });
        let errors = validate(&form);
        let reasons: Vec<_> = errors.iter().map(|error| error.reason.as_str()).collect();
        assert_eq!(reasons, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn edit_requires_a_label() {
        let form = DrawerForm::Edit(EditForm {
            id: VolumeId(1),
            label: String::from("\t"),
        });
        assert_eq!(fields(&validate(&form)), vec!["label"]);
    }

    #[test]
    fn clone_requires_a_new_label() {
        let form = DrawerForm::Clone(CloneForm {
            id: VolumeId(1),
            source_label: String::from("data"),
            clone_label: String::new(),
        });
        assert_eq!(fields(&validate(&form)), vec!["clone_label"]);
    }

    #[test]
    fn attach_requires_a_selection() {
        let empty = DrawerForm::Attach(AttachForm { selected: None });
        let picked = DrawerForm::Attach(AttachForm {
            selected: Some(VolumeId(2)),
        });
        assert_eq!(fields(&validate(&empty)), vec!["volume"]);
        assert!(validate(&picked).is_empty());
    }

    #[test]
    fn validation_is_idempotent() {
        let form = create("", "");
        assert_eq!(validate(&form), validate(&form));
    }
}
