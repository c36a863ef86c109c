use serde::ser::{Serialize, SerializeMap, Serializer};

/// An ordered run of labeled slots (`"Wk 1"`..`"Wk 5"`, `"Sun"`..`"Sat"`).
/// `None` serializes as `null` and means "not yet elapsed / no data",
/// which is distinct from a measured `0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledSeries {
    slots: Vec<(String, Option<f64>)>,
}

impl LabeledSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: Option<f64>) {
        self.slots.push((label.into(), value));
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.slots
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| *v)
    }

    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.slots.iter().map(|(_, v)| *v)
    }

    /// The last slot holding a value.
    pub fn last_value(&self) -> Option<f64> {
        self.slots.iter().rev().find_map(|(_, v)| *v)
    }
}

impl Serialize for LabeledSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (label, value) in &self.slots {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_in_insertion_order_with_nulls() {
        let mut series = LabeledSeries::new();
        series.push("Wk 2", Some(3.0));
        series.push("Wk 1", None);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"Wk 2":3.0,"Wk 1":null}"#);
        assert_eq!(series.last_value(), Some(3.0));
    }
}
