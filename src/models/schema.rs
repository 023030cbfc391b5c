//! Expected input schema discovery
//!
//! Each attempt looks at the artifact through [`Introspect`] only and either
//! finds an ordered column list or gives up. Attempts run in order and the
//! first one that finds a non-empty list wins.

use crate::models::artifact::Introspect;
use tracing::debug;

type SchemaAttempt = fn(&dyn Introspect) -> Option<Vec<String>>;

const ATTEMPTS: &[(&str, SchemaAttempt)] = &[
    ("stored_feature_names", from_stored_feature_names),
    ("column_selectors", from_column_selectors),
    ("step_feature_names", from_step_feature_names),
];

/// Infer the ordered columns the artifact was trained on, `None` if unknown.
pub fn infer_expected_schema(artifact: &dyn Introspect) -> Option<Vec<String>> {
    for (name, attempt) in ATTEMPTS {
        match attempt(artifact).filter(|cols| !cols.is_empty()) {
            Some(columns) => {
                debug!(attempt = name, columns = columns.len(), "Expected schema found");
                return Some(columns);
            }
            None => debug!(attempt = name, "Schema attempt found nothing"),
        }
    }
    None
}

fn from_stored_feature_names(artifact: &dyn Introspect) -> Option<Vec<String>> {
    artifact.stored_feature_names()
}

/// Raw columns named by preprocessing selectors, skipping `drop` selectors.
fn from_column_selectors(artifact: &dyn Introspect) -> Option<Vec<String>> {
    let mut columns: Vec<String> = Vec::new();
    for step in artifact.steps() {
        let Some(selectors) = step.column_selectors() else {
            continue;
        };
        for selector in &selectors {
            if selector.drop {
                debug!(
                    step = step.name(),
                    selector = %selector.name,
                    columns = selector.columns.len(),
                    "Skipping dropped columns"
                );
                continue;
            }
            for column in &selector.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
    }
    Some(columns)
}

fn from_step_feature_names(artifact: &dyn Introspect) -> Option<Vec<String>> {
    artifact
        .steps()
        .into_iter()
        .find_map(|step| {
            let names = step.stored_feature_names().filter(|n| !n.is_empty())?;
            debug!(step = step.name(), "Using feature names recorded on step");
            Some(names)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artifact::{ColumnSelector, StepIntrospect};

    struct Step {
        name: &'static str,
        selectors: Option<Vec<ColumnSelector>>,
        names: Option<Vec<String>>,
    }

    impl StepIntrospect for Step {
        fn name(&self) -> &str {
            self.name
        }

        fn column_selectors(&self) -> Option<Vec<ColumnSelector>> {
            self.selectors.clone()
        }

        fn stored_feature_names(&self) -> Option<Vec<String>> {
            self.names.clone()
        }
    }

    struct Fake {
        names: Option<Vec<String>>,
        steps: Vec<Step>,
    }

    impl Introspect for Fake {
        fn stored_feature_names(&self) -> Option<Vec<String>> {
            self.names.clone()
        }

        fn steps(&self) -> Vec<&dyn StepIntrospect> {
            self.steps.iter().map(|s| s as &dyn StepIntrospect).collect()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn selector(name: &str, columns: &[&str], drop: bool) -> ColumnSelector {
        ColumnSelector {
            name: name.to_string(),
            columns: strings(columns),
            drop,
        }
    }

    #[test]
    fn test_stored_names_win() {
        let fake = Fake {
            names: Some(strings(&["age", "income"])),
            steps: vec![Step {
                name: "pre",
                selectors: Some(vec![selector("num", &["other"], false)]),
                names: None,
            }],
        };

        assert_eq!(infer_expected_schema(&fake), Some(strings(&["age", "income"])));
    }

    #[test]
    fn test_selectors_deduplicated_and_drop_skipped() {
        let fake = Fake {
            names: None,
            steps: vec![
                Step {
                    name: "pre",
                    selectors: Some(vec![
                        selector("num", &["age", "income"], false),
                        selector("ids", &["customer_id"], true),
                        selector("cat", &["employment", "age"], false),
                    ]),
                    names: None,
                },
                Step {
                    name: "clf",
                    selectors: None,
                    names: Some(strings(&["x0", "x1"])),
                },
            ],
        };

        assert_eq!(
            infer_expected_schema(&fake),
            Some(strings(&["age", "income", "employment"]))
        );
    }

    #[test]
    fn test_falls_back_to_step_feature_names() {
        let fake = Fake {
            names: None,
            steps: vec![
                Step {
                    name: "scale",
                    selectors: None,
                    names: None,
                },
                Step {
                    name: "clf",
                    selectors: None,
                    names: Some(strings(&["a", "b"])),
                },
            ],
        };

        assert_eq!(infer_expected_schema(&fake), Some(strings(&["a", "b"])));
    }

    #[test]
    fn test_unknown_when_nothing_found() {
        let fake = Fake {
            names: Some(Vec::new()),
            steps: Vec::new(),
        };

        assert_eq!(infer_expected_schema(&fake), None);
    }
}
