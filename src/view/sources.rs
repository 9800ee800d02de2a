//! Typed sources for [`ViewNode::observe`](super::ViewNode::observe).
//!
//! A source set is a single [`Observable`] or a tuple of up to six. Its
//! values are read live each time the node renders and handed to the render
//! closure as a value (single cell) or tuple (several cells).

use crate::key::Key;
use crate::observable::Observable;
use crate::registry::Registry;

/// A set of cells a view node can observe.
pub trait Sources: 'static {
    /// What the render closure receives.
    type Values;

    /// The registry the cells post to.
    fn registry(&self) -> &Registry;

    /// The keys to register for, in source order.
    fn keys(&self) -> Vec<Key>;

    /// Current values of every cell.
    fn values(&self) -> Self::Values;

    /// Whether every cell posts to the same registry.
    fn same_registry(&self) -> bool;
}

impl<T: Clone + 'static> Sources for Observable<T> {
    type Values = T;

    fn registry(&self) -> &Registry {
        Observable::registry(self)
    }

    fn keys(&self) -> Vec<Key> {
        vec![self.key().clone()]
    }

    fn values(&self) -> T {
        self.get()
    }

    fn same_registry(&self) -> bool {
        true
    }
}

macro_rules! tuple_sources {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T: Clone + 'static),+> Sources for ($(Observable<$T>,)+) {
            type Values = ($($T,)+);

            fn registry(&self) -> &Registry {
                self.0.registry()
            }

            fn keys(&self) -> Vec<Key> {
                vec![$(self.$idx.key().clone()),+]
            }

            fn values(&self) -> Self::Values {
                ($(self.$idx.get(),)+)
            }

            fn same_registry(&self) -> bool {
                let first = self.0.registry();
                [$(self.$idx.registry()),+].iter().all(|r| r.ptr_eq(first))
            }
        }
    };
}

tuple_sources!(A => 0, B => 1);
tuple_sources!(A => 0, B => 1, C => 2);
tuple_sources!(A => 0, B => 1, C => 2, D => 3);
tuple_sources!(A => 0, B => 1, C => 2, D => 3, E => 4);
tuple_sources!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_source() {
        let registry = Registry::new();
        let name = Observable::new(&registry, String::from("aname"));
        assert_eq!(Sources::keys(&name), vec![name.key().clone()]);
        assert_eq!(Sources::values(&name), "aname");
    }

    #[test]
    fn tuple_values_are_read_live() {
        let registry = Registry::new();
        let a = Observable::new(&registry, 1);
        let b = Observable::new(&registry, "y");
        let sources = (a.clone(), b.clone());
        assert_eq!(sources.values(), (1, "y"));
        b.set("z");
        assert_eq!(sources.values(), (1, "z"));
        assert_eq!(sources.keys(), vec![a.key().clone(), b.key().clone()]);
    }

    #[test]
    fn six_tuple() {
        let registry = Registry::new();
        let cells: Vec<Observable<u8>> = (0..6).map(|i| Observable::new(&registry, i)).collect();
        let sources = (
            cells[0].clone(),
            cells[1].clone(),
            cells[2].clone(),
            cells[3].clone(),
            cells[4].clone(),
            cells[5].clone(),
        );
        assert_eq!(sources.values(), (0, 1, 2, 3, 4, 5));
        assert_eq!(sources.keys().len(), 6);
        assert!(sources.same_registry());
    }

    #[test]
    fn mixed_registries_are_detected() {
        let a = Observable::new(&Registry::new(), 1);
        let b = Observable::new(&Registry::new(), 2);
        assert!(!(a, b).same_registry());
    }
}
