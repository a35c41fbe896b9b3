/// Types that expose a comparable name.
pub trait HasName {
    fn name(&self) -> &str;
}

// Delegate HasName to references (and smart pointers if useful)
impl<T: HasName + ?Sized> HasName for &T {
    fn name(&self) -> &str {
        (*self).name()
    }
}
impl<T: HasName + ?Sized> HasName for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Sorting helpers for slices of `T: HasName`.
pub trait SortByName {
    /// Stable, ascending sort by `name()`.
    fn sort_by_name(&mut self);
}

impl<T: HasName> SortByName for [T] {
    fn sort_by_name(&mut self) {
        // `sort_by` is stable; compares &str by Unicode scalar values.
        self.sort_by(|a, b| a.name().cmp(b.name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(String);
    impl HasName for Named {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_has_name_box() {
        let item: Box<Named> = Box::new(Named("detector1".to_string()));
        assert_eq!(item.name(), "detector1");
    }

    #[test]
    fn test_sort_by_name() {
        let mut named = vec![
            Named("charlie".to_string()),
            Named("alice".to_string()),
            Named("bob".to_string()),
        ];
        named.as_mut_slice().sort_by_name();
        assert_eq!(named[0].name(), "alice");
        assert_eq!(named[1].name(), "bob");
        assert_eq!(named[2].name(), "charlie");
    }
}
