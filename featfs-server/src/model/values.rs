use crate::registry::ParamValue;

/// Ordered values written to one parameter entry
///
/// Every element comes out of the owning parameter's codec; the list never
/// holds a partially parsed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueList {
    values: Vec<ParamValue>,
}

impl ValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: ParamValue) {
        self.values.push(value);
    }

    /// Remove every value. Draining an empty list is a no-op.
    pub fn drain(&mut self) -> usize {
        let removed = self.values.len();
        self.values.clear();
        removed
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamValue> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> IntoIterator for &'a ValueList {
    type Item = &'a ParamValue;
    type IntoIter = std::slice::Iter<'a, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
