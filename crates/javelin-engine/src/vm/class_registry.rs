//! Class registry for managing class and method metadata
//!
//! Classes and methods live in two arenas indexed by [`ClassId`] and
//! [`MethodId`]. Every class registered through [`ClassRegistry::create_class`]
//! gets a static companion whose base is the companion of its base class.

use super::object::{Attribute, Class, ClassId, ClassKind, Layout, Method, MethodId};
use super::LayoutError;
use crate::ast::Visibility;
use crate::types::{PrimitiveKind, Type};
use rustc_hash::FxHashMap;

/// Class registry for the VM
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Class>,
    /// Methods indexed by ID
    methods: Vec<Method>,
    /// Class name to ID mapping (companions are not named)
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create a registry holding the well-known system classes
    ///
    /// `Object`, `String` and the boxed wrappers get the ids listed on
    /// [`ClassId`]. Their methods are installed by
    /// [`builtins::install`](super::builtins::install).
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            methods: Vec::new(),
            name_to_id: FxHashMap::default(),
        };
        for (name, expected) in [
            ("Object", ClassId::OBJECT),
            ("String", ClassId::STRING),
            ("Integer", ClassId::INTEGER),
            ("Float", ClassId::FLOAT),
            ("Double", ClassId::DOUBLE),
            ("Character", ClassId::CHARACTER),
            ("Boolean", ClassId::BOOLEAN),
        ] {
            let mut class = Class::new(expected, name, ClassKind::Class);
            class.base_class = (expected != ClassId::OBJECT).then_some(ClassId::OBJECT);
            class.is_system = true;
            class.layout = Some(Layout { template: Vec::new() });
            let id = registry.register_class(class);
            debug_assert_eq!(id, expected);
        }
        for shell in 0..=ClassId::BOOLEAN.0 {
            let companion = registry.attach_companion(ClassId(shell));
            registry.classes[companion.0].layout = Some(Layout { template: Vec::new() });
        }
        registry
    }

    /// Register a class as-is and return its ID
    pub fn register_class(&mut self, mut class: Class) -> ClassId {
        let id = self.next_class_id();
        class.id = id;
        if !class.is_static() {
            self.name_to_id.insert(class.name.clone(), id);
        }
        self.classes.push(class);
        id
    }

    /// Create a class together with its static companion
    ///
    /// Classes without an explicit base extend `Object`.
    pub fn create_class(&mut self, name: &str, kind: ClassKind, base: Option<ClassId>) -> ClassId {
        let base = match (kind, base) {
            (_, Some(base)) => Some(base),
            (ClassKind::Interface, None) => None,
            (_, None) => Some(ClassId::OBJECT),
        };
        let mut class = Class::new(ClassId(0), name, kind);
        class.base_class = base;
        let id = self.register_class(class);
        self.attach_companion(id);
        id
    }

    fn attach_companion(&mut self, id: ClassId) -> ClassId {
        let owner = &self.classes[id.0];
        let mut companion = Class::new(ClassId(0), owner.name.clone(), ClassKind::Static { owner: id });
        companion.is_system = owner.is_system;
        companion.base_class = owner
            .base_class
            .and_then(|b| self.get_class(b))
            .and_then(|b| b.static_class);
        let companion_id = self.register_class(companion);
        self.classes[id.0].static_class = Some(companion_id);
        companion_id
    }

    /// Get class by ID
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0)
    }

    /// Get class by ID, failing on unknown ids
    pub fn class(&self, id: ClassId) -> Result<&Class, LayoutError> {
        self.classes.get(id.0).ok_or(LayoutError::UnknownClass(id.0))
    }

    /// Get mutable class by ID
    pub fn get_class_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(id.0)
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(id.0))
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> ClassId {
        ClassId(self.classes.len())
    }

    /// Iterate over all classes
    pub fn iter(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    /// Static companion of a class
    pub fn companion(&self, id: ClassId) -> Option<ClassId> {
        self.get_class(id).and_then(|c| c.static_class)
    }

    /// Add an attribute; static attributes go to the companion
    pub fn add_attribute(&mut self, class: ClassId, attribute: Attribute) -> Result<(), LayoutError> {
        let target = if attribute.is_static {
            self.companion(class).ok_or(LayoutError::UnknownClass(class.0))?
        } else {
            class
        };
        let target = self
            .classes
            .get_mut(target.0)
            .ok_or(LayoutError::UnknownClass(target.0))?;
        if target.layout.is_some() {
            return Err(LayoutError::AlreadyFinalized(target.name.clone()));
        }
        target.attributes.push(attribute);
        Ok(())
    }

    /// Add a method to its owner's overload group
    pub fn add_method(&mut self, class: ClassId, mut method: Method) -> MethodId {
        let id = MethodId(self.methods.len());
        method.id = id;
        method.owner = class;
        if let Some(owner) = self.classes.get_mut(class.0) {
            owner
                .method_groups
                .entry(method.name.clone())
                .or_default()
                .push(id);
            owner.methods.push(id);
        }
        self.methods.push(method);
        id
    }

    /// Get method by ID
    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.0)
    }

    /// Get mutable method by ID
    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut Method> {
        self.methods.get_mut(id.0)
    }

    /// Whether the class layout has been finalized
    pub fn is_finalized(&self, id: ClassId) -> bool {
        self.get_class(id).map(|c| c.layout.is_some()).unwrap_or(false)
    }

    /// Assign attribute indices and build the attribute template
    ///
    /// Unfinalized bases are finalized first, then the class continues the
    /// numbering after its base's slots. The companion is finalized along
    /// with its owner. Finalizing a class twice is an error.
    pub fn finalize_layout(&mut self, id: ClassId) -> Result<(), LayoutError> {
        let class = self.class(id)?;
        if class.layout.is_some() {
            return Err(LayoutError::AlreadyFinalized(class.name.clone()));
        }
        self.finalize_unchecked(id)?;
        if let Some(companion) = self.companion(id) {
            if !self.is_finalized(companion) {
                self.finalize_unchecked(companion)?;
            }
        }
        Ok(())
    }

    fn finalize_unchecked(&mut self, id: ClassId) -> Result<(), LayoutError> {
        let base = self.class(id)?.base_class;
        let mut template = match base {
            Some(base) => {
                if !self.is_finalized(base) {
                    self.finalize_layout(base)?;
                }
                self.class(base)?
                    .layout
                    .as_ref()
                    .map(|layout| layout.template.clone())
                    .ok_or_else(|| LayoutError::NotFinalized(self.display_name(base)))?
            }
            None => Vec::new(),
        };
        let class = self
            .classes
            .get_mut(id.0)
            .ok_or(LayoutError::UnknownClass(id.0))?;
        for attribute in &mut class.attributes {
            attribute.index = Some(template.len());
            template.push(attribute.template_value());
        }
        class.layout = Some(Layout { template });
        tracing::trace!(class = %class.name, slots = class.attributes.len(), "layout finalized");
        Ok(())
    }

    fn display_name(&self, id: ClassId) -> String {
        self.get_class(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    /// The class followed by its bases, nearest first
    pub fn ancestors(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(class) = current.and_then(|c| self.get_class(c)) {
            chain.push(class.id);
            current = class.base_class;
        }
        chain
    }

    /// Subclass or implementor test (reflexive, transitive)
    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        if class == ancestor {
            return true;
        }
        let Some(c) = self.get_class(class) else {
            return false;
        };
        if ancestor == ClassId::OBJECT && !c.is_static() {
            return true;
        }
        c.base_class
            .into_iter()
            .chain(c.interfaces.iter().copied())
            .any(|parent| self.is_subclass_of(parent, ancestor))
    }

    /// Instance attributes of a class and its bases, in slot order
    pub fn instance_attributes(&self, id: ClassId) -> Vec<(ClassId, &Attribute)> {
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|c| self.get_class(c))
            .flat_map(|c| c.attributes.iter().map(move |a| (c.id, a)))
            .collect()
    }

    /// Nearest instance attribute named `name`
    pub fn find_attribute(&self, id: ClassId, name: &str) -> Option<&Attribute> {
        self.ancestors(id)
            .into_iter()
            .filter_map(|c| self.get_class(c))
            .find_map(|c| c.attribute(name))
    }

    /// Nearest static attribute named `name`, with the class declaring it
    pub fn find_static_attribute(&self, id: ClassId, name: &str) -> Option<(ClassId, &Attribute)> {
        self.ancestors(id).into_iter().find_map(|owner| {
            let companion = self.companion(owner)?;
            self.get_class(companion)?
                .attribute(name)
                .map(|attribute| (owner, attribute))
        })
    }

    /// Methods named `name` visible on a class, nearest declaration first
    ///
    /// Overridden methods are hidden by their overrides. Interfaces
    /// contribute their signatures after the class chain.
    pub fn find_methods(&self, id: ClassId, name: &str) -> Vec<MethodId> {
        let mut found: Vec<MethodId> = Vec::new();
        let mut pending = vec![id];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            let Some(class) = self.get_class(current) else {
                continue;
            };
            for &candidate in class.overloads(name) {
                let Some(method) = self.method(candidate) else {
                    continue;
                };
                let hidden = found
                    .iter()
                    .filter_map(|m| self.method(*m))
                    .any(|m| m.same_signature(method));
                if !hidden {
                    found.push(candidate);
                }
            }
            pending.extend(class.interfaces.iter().rev().copied());
            if let Some(base) = class.base_class {
                pending.push(base);
            }
        }
        found
    }

    /// Implementation of `method` for an instance of `dynamic_class`
    ///
    /// Walks the dynamic class chain for the nearest non-abstract method with
    /// the same signature. Falls back to `method` itself.
    pub fn resolve_virtual(&self, dynamic_class: ClassId, method: MethodId) -> MethodId {
        let Some(declared) = self.method(method) else {
            return method;
        };
        for class in self.ancestors(dynamic_class) {
            let Some(class) = self.get_class(class) else {
                continue;
            };
            let found = class
                .overloads(&declared.name)
                .iter()
                .filter_map(|m| self.method(*m))
                .find(|m| !m.is_abstract && m.same_signature(declared));
            if let Some(found) = found {
                return found.id;
            }
        }
        method
    }

    /// Resolve a type name to a type
    pub fn resolve_type_name(&self, name: &str) -> Option<Type> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Some(Type::Primitive(kind));
        }
        self.get_class_by_name(name).map(|c| c.ty())
    }

    /// Whether `member` is visible from code inside `from`
    pub fn is_accessible(&self, owner: ClassId, visibility: Visibility, from: Option<ClassId>) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Protected => from.map(|f| self.is_subclass_of(f, owner)).unwrap_or(false),
            Visibility::Private => from == Some(owner),
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
