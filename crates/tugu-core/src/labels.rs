//! Class labels of the monument classifier.

/// Label returned for an index the model should never produce.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Output index → monument name, in the order the model was trained with.
pub const MONUMENT_LABELS: [&str; 12] = [
    "Monumen Ikada",
    "Monumen Nasional",
    "Monumen Perjuangan",
    "Monumen Selamat Datang",
    "Patung Bung Karno",
    "Patung Diponegoro",
    "Patung Kartini",
    "Patung Kuda Arjuna Wijaya",
    "Patung M.H. Thamrin",
    "Patung Pembebasan Irian Barat",
    "Patung Persahabatan",
    "Tugu Tani",
];

/// Immutable, index-addressed label table.
#[derive(Debug, Clone, Copy)]
pub struct LabelTable {
    labels: &'static [&'static str],
}

impl LabelTable {
    /// Table over an arbitrary static label list.
    pub const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    /// The twelve Jakarta monuments.
    pub const fn monuments() -> Self {
        Self::new(&MONUMENT_LABELS)
    }

    /// Label for `index`, or [`UNKNOWN_LABEL`] when out of range.
    pub fn label(&self, index: usize) -> &'static str {
        self.labels.get(index).copied().unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::monuments()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_label_lookup() {
        let labels = LabelTable::monuments();
        assert_eq!(labels.len(), 12);
        assert_eq!(labels.label(0), "Monumen Ikada");
        assert_eq!(labels.label(4), "Patung Bung Karno");
        assert_eq!(labels.label(11), "Tugu Tani");
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let labels = LabelTable::monuments();
        assert_eq!(labels.label(12), UNKNOWN_LABEL);
        assert_eq!(labels.label(99), "Unknown");
    }
}
