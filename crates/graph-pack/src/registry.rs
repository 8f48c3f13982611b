//! Class id → blank-instance factory mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::{ObjectRef, Saveable};

/// Produces a blank instance ready to receive fields.
pub type Factory = Arc<dyn Fn() -> ObjectRef + Send + Sync>;

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Maps textual class ids to factories.
///
/// Entries are registered explicitly at startup; nothing is discovered at
/// runtime. A registry is immutable once handed to a reader, so one instance
/// can serve any number of concurrent decodes.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `class_id`, replacing any previous entry.
    pub fn register<F>(&mut self, class_id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> ObjectRef + Send + Sync + 'static,
    {
        let class_id = class_id.into();
        if self.factories.contains_key(&class_id) {
            log::warn!("replacing factory for class `{class_id}`");
        }
        self.factories.insert(class_id, Arc::new(factory));
        self
    }

    /// Registers `T` under the class id its default instance reports.
    pub fn register_type<T: Saveable + Default>(&mut self) -> &mut Self {
        let class_id = T::default().class_id().to_owned();
        self.register(class_id, || ObjectRef::new(T::default()))
    }

    /// Builder form of [`register_type`](Self::register_type).
    pub fn with_type<T: Saveable + Default>(mut self) -> Self {
        self.register_type::<T>();
        self
    }

    /// Creates a blank instance of `class_id`, if it is registered.
    pub fn create(&self, class_id: &str) -> Option<ObjectRef> {
        self.factories.get(class_id).map(|factory| factory())
    }

    pub fn contains(&self, class_id: &str) -> bool {
        self.factories.contains_key(class_id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn class_ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Installs this registry as the process-wide one.
    ///
    /// Succeeds once; later calls hand the registry back unchanged.
    pub fn install_global(self) -> Result<(), TypeRegistry> {
        GLOBAL.set(self)
    }

    /// The process-wide registry, or an empty one if none was installed.
    pub fn global() -> &'static TypeRegistry {
        GLOBAL.get_or_init(TypeRegistry::new)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.class_ids().collect();
        ids.sort_unstable();
        f.debug_struct("TypeRegistry").field("classes", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldWriter;

    #[derive(Default)]
    struct Probe;

    impl Saveable for Probe {
        fn class_id(&self) -> &str {
            "Probe"
        }

        fn save(&self, _out: &mut FieldWriter) {}
    }

    #[test]
    fn register_type_uses_reported_class_id() {
        let registry = TypeRegistry::new().with_type::<Probe>();
        assert!(registry.contains("Probe"));
        let obj = registry.create("Probe").unwrap();
        assert_eq!(obj.class_id(), "Probe");
        assert!(obj.downcast_ref::<Probe>().is_some());
    }

    #[test]
    fn unknown_class_creates_nothing() {
        let registry = TypeRegistry::new();
        assert!(registry.create("Missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn factories_produce_distinct_instances() {
        let mut registry = TypeRegistry::new();
        registry.register("Probe", || ObjectRef::new(Probe));
        let a = registry.create("Probe").unwrap();
        let b = registry.create("Probe").unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn global_registry_installs_once() {
        assert!(TypeRegistry::new().with_type::<Probe>().install_global().is_ok());
        assert!(TypeRegistry::new().install_global().is_err());
        assert!(TypeRegistry::global().contains("Probe"));
    }
}
