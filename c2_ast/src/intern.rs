use bumpalo::Bump;
use indexmap::IndexSet;
use std::cell::RefCell;
use std::hash::Hash;

/// Hands out one canonical allocation per distinct value. Everything lives in
/// the bump arena, so an `Interned` stays valid for the whole build.
pub struct Interner<'ctx, T: ?Sized> {
    internal: RefCell<InternerInternal<'ctx, T>>,
}

struct InternerInternal<'ctx, T: ?Sized> {
    bump: &'ctx Bump,
    items: IndexSet<&'ctx T>,
}

impl<'ctx, T: ?Sized> Interner<'ctx, T> {
    pub fn new(bump: &'ctx Bump) -> Self {
        Self {
            internal: RefCell::new(InternerInternal {
                bump,
                items: IndexSet::default(),
            }),
        }
    }
}

impl<'ctx, T: Hash + Eq> Interner<'ctx, T> {
    pub fn define(&self, item: T) -> Interned<'ctx, T> {
        let mut internal = self.internal.borrow_mut();
        if let Some(item) = internal.items.get(&item) {
            Interned(item)
        } else {
            let item: &'ctx T = internal.bump.alloc(item);
            internal.items.insert(item);
            Interned(item)
        }
    }
}

impl<'ctx> Interner<'ctx, str> {
    pub fn define_str(&self, item: &str) -> Interned<'ctx, str> {
        let mut internal = self.internal.borrow_mut();
        if let Some(item) = internal.items.get(item) {
            Interned(item)
        } else {
            let item: &'ctx str = internal.bump.alloc_str(item);
            internal.items.insert(item);
            Interned(item)
        }
    }
}

/// A reference into an [`Interner`]. Equality and hashing go through the
/// pointer, which is sound because the interner never hands out two
/// allocations for one value.
pub struct Interned<'ctx, T: ?Sized>(&'ctx T);

impl<'ctx, T: ?Sized> Clone for Interned<'ctx, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'ctx, T: ?Sized> Copy for Interned<'ctx, T> {}

impl<'ctx, T: ?Sized> PartialEq for Interned<'ctx, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'ctx, T: ?Sized> Eq for Interned<'ctx, T> {}

impl<'ctx, T: ?Sized> Hash for Interned<'ctx, T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.0 as *const T).hash(state)
    }
}

impl<'ctx, T: ?Sized> std::fmt::Debug for Interned<'ctx, T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'ctx, T: ?Sized> std::fmt::Display for Interned<'ctx, T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'ctx, T: ?Sized> std::ops::Deref for Interned<'ctx, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'ctx, T: ?Sized> AsRef<T> for Interned<'ctx, T> {
    fn as_ref(&self) -> &T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let bump = Bump::new();
        let symbols = Interner::<str>::new(&bump);

        let a = symbols.define_str("point");
        let b = symbols.define_str("point");
        let c = symbols.define_str("other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(&*a, "point");
    }
}
