use std::collections::HashMap;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{Dataset, parse_samples};
use crate::error::RedmineError;
use crate::redmine::{CustomField, CustomFieldValue, Issue};

pub const COMPONENT_FIELD: &str = "Component DB";
pub const SPECIES_FIELD: &str = "Organism Abbreviation";
pub const DATASET_NAME_FIELD: &str = "Internal dataset name";
pub const SAMPLES_FIELD: &str = "Sample Names";

/// Custom fields of one issue, keyed by field name.
pub struct CustomFields<'a> {
    by_name: HashMap<&'a str, &'a CustomField>,
}

impl<'a> CustomFields<'a> {
    pub fn from_issue(issue: &'a Issue) -> Self {
        let by_name = issue
            .custom_fields
            .iter()
            .map(|field| (field.name.as_str(), field))
            .collect();
        Self { by_name }
    }

    /// Single value of a field; `None` when the field is absent or empty.
    pub fn value(&self, name: &str) -> Result<Option<&'a str>, RedmineError> {
        let Some(&field) = self.by_name.get(name) else {
            return Ok(None);
        };
        match &field.value {
            None => Ok(None),
            Some(CustomFieldValue::Text(text)) => Ok(Some(text.as_str())),
            Some(CustomFieldValue::List(values)) => match values.as_slice() {
                [] => Ok(None),
                [single] => Ok(Some(single.as_str())),
                _ => Err(RedmineError::MultiValuedField {
                    field: name.to_string(),
                    count: values.len(),
                }),
            },
        }
    }

    /// Like [`CustomFields::value`], reporting the field and defaulting to "" when absent.
    pub fn value_or_empty(
        &self,
        issue_id: u64,
        name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<String, RedmineError> {
        match self.value(name)? {
            Some(value) => Ok(value.to_string()),
            None => {
                tracing::debug!(issue = issue_id, field = name, "custom field absent");
                sink.event(ProgressEvent {
                    message: format!("No field {name}"),
                });
                Ok(String::new())
            }
        }
    }
}

pub fn parse_dataset(issue: &Issue, sink: &dyn ProgressSink) -> Result<Dataset, RedmineError> {
    let customs = CustomFields::from_issue(issue);

    let component = customs.value_or_empty(issue.id, COMPONENT_FIELD, sink)?;
    let species = customs.value_or_empty(issue.id, SPECIES_FIELD, sink)?;
    let name = customs.value_or_empty(issue.id, DATASET_NAME_FIELD, sink)?;
    let samples_text = customs.value_or_empty(issue.id, SAMPLES_FIELD, sink)?;

    let runs = parse_samples(&samples_text)?;
    let dataset = Dataset {
        component,
        species,
        name,
        runs,
    };

    let missing = dataset.missing_fields();
    if !missing.is_empty() {
        return Err(RedmineError::MissingMetadata { fields: missing });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use assert_matches::assert_matches;

    use super::*;

    #[derive(Default)]
    struct Messages(RefCell<Vec<String>>);

    impl ProgressSink for Messages {
        fn event(&self, event: ProgressEvent) {
            self.0.borrow_mut().push(event.message);
        }
    }

    fn text(name: &str, value: &str) -> CustomField {
        CustomField {
            id: 0,
            name: name.to_string(),
            value: Some(CustomFieldValue::Text(value.to_string())),
        }
    }

    fn list(name: &str, values: &[&str]) -> CustomField {
        CustomField {
            id: 0,
            name: name.to_string(),
            value: Some(CustomFieldValue::List(
                values.iter().map(|v| v.to_string()).collect(),
            )),
        }
    }

    fn issue(fields: Vec<CustomField>) -> Issue {
        Issue {
            id: 1,
            subject: "test".to_string(),
            custom_fields: fields,
        }
    }

    #[test]
    fn single_element_list_unwraps() {
        let issue = issue(vec![list(SPECIES_FIELD, &["pfal3D7"])]);
        let customs = CustomFields::from_issue(&issue);
        assert_eq!(customs.value(SPECIES_FIELD).unwrap(), Some("pfal3D7"));
    }

    #[test]
    fn multi_valued_list_is_an_error() {
        let issue = issue(vec![list(SPECIES_FIELD, &["a", "b"])]);
        let customs = CustomFields::from_issue(&issue);
        assert_matches!(
            customs.value(SPECIES_FIELD),
            Err(RedmineError::MultiValuedField { count: 2, .. })
        );
    }

    #[test]
    fn absent_field_defaults_to_empty_and_is_reported() {
        let issue = issue(Vec::new());
        let customs = CustomFields::from_issue(&issue);
        let messages = Messages::default();
        assert_eq!(customs.value(COMPONENT_FIELD).unwrap(), None);
        assert_eq!(
            customs.value_or_empty(1, COMPONENT_FIELD, &messages).unwrap(),
            ""
        );
        assert_eq!(messages.0.borrow().as_slice(), ["No field Component DB"]);
    }

    #[test]
    fn parse_complete_dataset() {
        let issue = issue(vec![
            text(COMPONENT_FIELD, "PlasmoDB"),
            text(SPECIES_FIELD, "pfal3D7"),
            text(DATASET_NAME_FIELD, "liver_stage"),
            text(SAMPLES_FIELD, "lib1: SRR001, SRR002\nlib2: SRR003"),
        ]);
        let messages = Messages::default();
        let dataset = parse_dataset(&issue, &messages).unwrap();
        assert!(messages.0.borrow().is_empty());
        assert_eq!(dataset.component, "PlasmoDB");
        assert_eq!(dataset.runs.len(), 2);
        assert_eq!(dataset.runs[1].accessions, vec!["SRR003"]);
    }

    #[test]
    fn missing_name_is_reported() {
        let issue = issue(vec![
            text(COMPONENT_FIELD, "PlasmoDB"),
            text(SPECIES_FIELD, "pfal3D7"),
            text(SAMPLES_FIELD, "lib1: SRR001"),
        ]);
        assert_matches!(
            parse_dataset(&issue, &Messages::default()),
            Err(RedmineError::MissingMetadata { ref fields }) if fields == &vec!["name"]
        );
    }

    #[test]
    fn missing_samples_field_is_an_error() {
        let issue = issue(vec![
            text(COMPONENT_FIELD, "c"),
            text(SPECIES_FIELD, "s"),
            text(DATASET_NAME_FIELD, "n"),
        ]);
        let messages = Messages::default();
        assert_matches!(
            parse_dataset(&issue, &messages),
            Err(RedmineError::SampleLine(_))
        );
        assert_eq!(messages.0.borrow().as_slice(), ["No field Sample Names"]);
    }
}
