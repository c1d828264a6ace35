//! Typed container for values plugins provide to one another.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Type-keyed container for values shared between plugins.
///
/// A plugin that owns a resource (a database handle, a parsed configuration,
/// an API client) provides it here; other plugins and the host application
/// retrieve it by type. Values are stored behind `Rc`, so retrieval hands out
/// a shared handle rather than a borrow: callers can hold on to the value
/// without keeping the container borrowed.
///
/// # Example
///
/// ```rust
/// use outset_plug::Options;
///
/// struct Paths {
///     data_dir: String,
/// }
///
/// let mut options = Options::new();
/// options.set(Paths { data_dir: "/var/lib/notes".into() });
///
/// let paths = options.get::<Paths>().unwrap();
/// assert_eq!(paths.data_dir, "/var/lib/notes");
/// ```
#[derive(Default)]
pub struct Options {
    map: HashMap<TypeId, Rc<dyn Any>>,
}

impl Options {
    /// Creates a new empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn set<T: 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Rc::new(value));
    }

    /// Retrieves a shared handle to the value of the given type.
    ///
    /// Returns `None` if no value of this type has been provided.
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| Rc::clone(value).downcast::<T>().ok())
    }

    /// Retrieves a value of the given type, or fails with a descriptive error.
    pub fn get_required<T: 'static>(&self) -> Result<Rc<T>, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "option missing: no value of type {} was provided",
                std::any::type_name::<T>()
            )
        })
    }

    /// Returns `true` if a value of the given type has been provided.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}
