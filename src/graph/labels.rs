use std::collections::HashMap;

/// Generates query variable names that stay unique per normalized label.
///
/// Counters are never decremented: a name released by a removed node is not
/// handed out again until [`InternalLabels::reset`].
#[derive(Clone, Debug, Default)]
pub struct InternalLabels {
    counters: HashMap<String, u64>,
}

impl InternalLabels {
    /// Creates an empty generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next variable name for `label`.
    ///
    /// The label is lower-cased and stripped of spaces (empty becomes `n`).
    /// The first call returns the bare normalized label, later calls append
    /// `1`, `2`, ...
    pub fn generate(&mut self, label: &str) -> String {
        let normalized = normalize(label);
        match self.counters.get_mut(&normalized) {
            Some(counter) => {
                *counter += 1;
                format!("{normalized}{counter}")
            }
            None => {
                self.counters.insert(normalized.clone(), 0);
                normalized
            }
        }
    }

    /// Forgets every counter.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

fn normalize(label: &str) -> String {
    let normalized: String = label
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect();
    if normalized.is_empty() {
        "n".to_owned()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_labels_get_numbered() {
        let mut labels = InternalLabels::new();
        assert_eq!(labels.generate("Person"), "person");
        assert_eq!(labels.generate("Person"), "person1");
        assert_eq!(labels.generate("Person"), "person2");
    }

    #[test]
    fn case_and_spaces_share_a_namespace() {
        let mut labels = InternalLabels::new();
        assert_eq!(labels.generate("Person"), "person");
        assert_eq!(labels.generate("person "), "person1");
        assert_eq!(labels.generate("PERSON"), "person2");
        assert_eq!(labels.generate("Big Company"), "bigcompany");
    }

    #[test]
    fn empty_label_uses_n() {
        let mut labels = InternalLabels::new();
        assert_eq!(labels.generate(""), "n");
        assert_eq!(labels.generate("  "), "n1");
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut labels = InternalLabels::new();
        labels.generate("Movie");
        labels.generate("Movie");
        labels.reset();
        assert_eq!(labels.generate("Movie"), "movie");
    }
}
