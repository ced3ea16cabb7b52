//! Helper state attached to built-in collection instances
//!
//! Collection classes do not declare attributes for their storage. Their
//! instances instead carry one helper per [`IntrinsicKind`] in a small map,
//! so the declared slots stay exactly what the layout describes.

use super::Value;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Kinds of intrinsic helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    /// Backing store of `ArrayList`
    List,
    /// Backing store of `HashMap`
    Map,
    /// Backing store of `HashSet`
    Set,
}

/// Hashable identity of a value used as map key or set element
///
/// Primitive-like values compare by content. Heap references compare by
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    /// `null`
    Null,
    /// int
    Int(i32),
    /// float bits
    Float(u32),
    /// double bits
    Double(u64),
    /// boolean
    Bool(bool),
    /// char
    Char(char),
    /// string content
    Str(Rc<str>),
    /// object identity
    Object(u32),
    /// array identity
    Array(u32),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKey::Null,
            Value::Int(v) => ValueKey::Int(*v),
            Value::Float(v) => ValueKey::Float(v.to_bits()),
            Value::Double(v) => ValueKey::Double(v.to_bits()),
            Value::Bool(v) => ValueKey::Bool(*v),
            Value::Char(v) => ValueKey::Char(*v),
            Value::Str(v) => ValueKey::Str(v.clone()),
            Value::Object(r) => ValueKey::Object(r.0),
            Value::Array(r) => ValueKey::Array(r.0),
        }
    }
}

/// Backing store of a list
#[derive(Debug, Clone, Default)]
pub struct ListHelper {
    /// Elements in order
    pub items: Vec<Value>,
}

/// Backing store of a map, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MapHelper {
    keys: Vec<Value>,
    values: Vec<Value>,
    index: FxHashMap<ValueKey, usize>,
}

impl MapHelper {
    /// Insert or replace; returns the previous value
    pub fn put(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.index.get(&ValueKey::from(&key)) {
            Some(&slot) => Some(std::mem::replace(&mut self.values[slot], value)),
            None => {
                self.index.insert(ValueKey::from(&key), self.keys.len());
                self.keys.push(key);
                self.values.push(value);
                None
            }
        }
    }

    /// Value stored under `key`
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&ValueKey::from(key))
            .map(|&slot| &self.values[slot])
    }

    /// Key present
    pub fn contains_key(&self, key: &Value) -> bool {
        self.index.contains_key(&ValueKey::from(key))
    }

    /// Some entry holds a value identical to `value`
    pub fn contains_value(&self, value: &Value) -> bool {
        self.values.iter().any(|v| v.identical(value))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// No entries
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
        self.index.clear();
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.keys.iter().zip(&self.values)
    }
}

/// Backing store of a set, in insertion order
#[derive(Debug, Clone, Default)]
pub struct SetHelper {
    items: Vec<Value>,
    index: FxHashMap<ValueKey, usize>,
}

impl SetHelper {
    /// Add an element; false if it was already present
    pub fn add(&mut self, value: Value) -> bool {
        let key = ValueKey::from(&value);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(value);
        true
    }

    /// Element present
    pub fn contains(&self, value: &Value) -> bool {
        self.index.contains_key(&ValueKey::from(value))
    }

    /// Remove an element; false if it was absent
    pub fn remove(&mut self, value: &Value) -> bool {
        let Some(slot) = self.index.remove(&ValueKey::from(value)) else {
            return false;
        };
        self.items.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        true
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove all elements
    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Elements in insertion order
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

/// One helper
#[derive(Debug, Clone)]
pub enum Intrinsic {
    /// List store
    List(ListHelper),
    /// Map store
    Map(MapHelper),
    /// Set store
    Set(SetHelper),
}

impl Intrinsic {
    /// Empty helper of the given kind
    pub fn empty(kind: IntrinsicKind) -> Self {
        match kind {
            IntrinsicKind::List => Intrinsic::List(ListHelper::default()),
            IntrinsicKind::Map => Intrinsic::Map(MapHelper::default()),
            IntrinsicKind::Set => Intrinsic::Set(SetHelper::default()),
        }
    }

    /// Kind of this helper
    pub fn kind(&self) -> IntrinsicKind {
        match self {
            Intrinsic::List(_) => IntrinsicKind::List,
            Intrinsic::Map(_) => IntrinsicKind::Map,
            Intrinsic::Set(_) => IntrinsicKind::Set,
        }
    }
}

/// Helpers attached to one instance
#[derive(Debug, Clone, Default)]
pub struct IntrinsicData {
    entries: Vec<Intrinsic>,
}

impl IntrinsicData {
    /// Helper stored for `kind`
    pub fn get(&self, kind: IntrinsicKind) -> Option<&Intrinsic> {
        self.entries.iter().find(|entry| entry.kind() == kind)
    }

    /// Mutable helper stored for `kind`
    pub fn get_mut(&mut self, kind: IntrinsicKind) -> Option<&mut Intrinsic> {
        self.entries.iter_mut().find(|entry| entry.kind() == kind)
    }

    /// Attach a helper, replacing one of the same kind
    pub fn insert(&mut self, helper: Intrinsic) {
        match self.get_mut(helper.kind()) {
            Some(slot) => *slot = helper,
            None => self.entries.push(helper),
        }
    }

    /// No helpers attached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// List helper
    pub fn list(&self) -> Option<&ListHelper> {
        match self.get(IntrinsicKind::List) {
            Some(Intrinsic::List(helper)) => Some(helper),
            _ => None,
        }
    }

    /// Mutable list helper
    pub fn list_mut(&mut self) -> Option<&mut ListHelper> {
        match self.get_mut(IntrinsicKind::List) {
            Some(Intrinsic::List(helper)) => Some(helper),
            _ => None,
        }
    }

    /// Map helper
    pub fn map(&self) -> Option<&MapHelper> {
        match self.get(IntrinsicKind::Map) {
            Some(Intrinsic::Map(helper)) => Some(helper),
            _ => None,
        }
    }

    /// Mutable map helper
    pub fn map_mut(&mut self) -> Option<&mut MapHelper> {
        match self.get_mut(IntrinsicKind::Map) {
            Some(Intrinsic::Map(helper)) => Some(helper),
            _ => None,
        }
    }

    /// Set helper
    pub fn set(&self) -> Option<&SetHelper> {
        match self.get(IntrinsicKind::Set) {
            Some(Intrinsic::Set(helper)) => Some(helper),
            _ => None,
        }
    }

    /// Mutable set helper
    pub fn set_mut(&mut self) -> Option<&mut SetHelper> {
        match self.get_mut(IntrinsicKind::Set) {
            Some(Intrinsic::Set(helper)) => Some(helper),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_put_replaces_in_place() {
        let mut map = MapHelper::default();
        map.put(Value::string("a"), Value::Int(1));
        map.put(Value::string("b"), Value::Int(2));
        assert_eq!(map.put(Value::string("a"), Value::Int(3)), Some(Value::Int(1)));
        let entries: Vec<_> = map.entries().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(
            entries,
            vec![(Value::string("a"), Value::Int(3)), (Value::string("b"), Value::Int(2))]
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_map_lookup() {
        let mut map = MapHelper::default();
        map.put(Value::Int(1), Value::string("one"));
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::string("one")));
        assert!(map.contains_value(&Value::string("one")));
        assert!(!map.contains_key(&Value::Double(1.0)));
        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_set_remove_keeps_order() {
        let mut set = SetHelper::default();
        assert!(set.add(Value::Int(1)));
        assert!(set.add(Value::Int(2)));
        assert!(set.add(Value::Int(3)));
        assert!(!set.add(Value::Int(2)));
        assert!(set.remove(&Value::Int(1)));
        assert!(!set.remove(&Value::Int(1)));
        assert_eq!(set.items(), &[Value::Int(2), Value::Int(3)]);
        assert!(set.contains(&Value::Int(3)));
        assert!(set.add(Value::Int(1)));
        assert_eq!(set.items(), &[Value::Int(2), Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn test_intrinsic_data_lookup() {
        let mut data = IntrinsicData::default();
        assert!(data.get(IntrinsicKind::List).is_none());
        data.insert(Intrinsic::empty(IntrinsicKind::List));
        data.list_mut().unwrap().items.push(Value::Int(4));
        assert_eq!(data.list().unwrap().items, vec![Value::Int(4)]);
        assert!(data.map().is_none());
    }
}
