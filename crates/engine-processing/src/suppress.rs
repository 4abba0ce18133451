use model::core::value::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Listing-style repeat suppression: a configured field prints blank when
/// its value equals the one printed on the previous detail line.
///
/// A field that is part of a break level's key is bound to the shallowest
/// such level, and its memory is cleared whenever that level or a
/// shallower one breaks, so the first detail of a new group always shows
/// it.
#[derive(Debug, Clone, Default)]
pub struct Suppressor {
    fields: BTreeSet<String>,
    bindings: HashMap<String, usize>,
    previous: BTreeMap<String, Value>,
}

impl Suppressor {
    pub fn new<'a>(
        fields: impl IntoIterator<Item = &'a String>,
        level_fields: &[Vec<String>],
    ) -> Self {
        let fields: BTreeSet<String> = fields.into_iter().map(|f| f.to_ascii_lowercase()).collect();
        let mut bindings = HashMap::new();
        for field in &fields {
            if let Some(level) = level_fields
                .iter()
                .position(|keys| keys.iter().any(|k| k.eq_ignore_ascii_case(field)))
            {
                bindings.insert(field.clone(), level);
            }
        }
        Self {
            fields,
            bindings,
            previous: BTreeMap::new(),
        }
    }

    /// Returns true when the field should print blank, and remembers the
    /// value for the next line.
    pub fn suppress(&mut self, field: &str, value: &Value) -> bool {
        let key = field.to_ascii_lowercase();
        if !self.fields.contains(&key) {
            return false;
        }
        let repeated = self
            .previous
            .get(&key)
            .is_some_and(|prev| prev.equal(value));
        self.previous.insert(key, value.clone());
        repeated
    }

    /// Forgets fields bound to `level` or any deeper level.
    pub fn reset_from_level(&mut self, level: usize) {
        let bindings = &self.bindings;
        self.previous
            .retain(|field, _| bindings.get(field).is_none_or(|bound| *bound < level));
    }

    pub fn reset_all(&mut self) {
        self.previous.clear();
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.previous.clone()
    }

    pub fn restore(&mut self, previous: BTreeMap<String, Value>) {
        self.previous = previous
            .into_iter()
            .filter(|(field, _)| self.fields.contains(field))
            .collect();
    }
}
