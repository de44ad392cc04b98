use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::symbol::Symbol;
use crate::tensor::Tensor;

// Arenas — the two process-wide tensor stores
//
// TENSORS holds every activation buffer (inputs, parameters, node outputs);
// GRADS holds one gradient buffer per trainable symbol. Both are append-only
// while a Model is being constructed and mutated in place by kernels during
// the sweeps.
//
// Slots are indexed by symbol id. Because ids restart when the arenas are
// cleared, constructing a Model clears both arenas first — symbols minted
// for an earlier graph are invalid from that point on, and only one Model
// is usable at a time.
//
// Lock discipline: the executor acquires TENSORS before GRADS and holds
// both for a whole sweep. Hosts reading gradients must not hold a guard
// across a `forward`/`backward` call.

/// A symbol-keyed tensor store. Slot i belongs to the symbol with id i.
#[derive(Debug, Default)]
pub struct TensorStore {
    slots: Vec<Option<Tensor>>,
}

impl TensorStore {
    pub const fn new() -> Self {
        TensorStore { slots: Vec::new() }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, sym: &Symbol) -> bool {
        self.slots
            .get(sym.id() as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// Insert a tensor for a symbol. The tensor's shape must match the
    /// symbol's; inserting twice under one symbol is an error.
    pub fn append(&mut self, sym: &Symbol, tensor: Tensor) -> Result<()> {
        if tensor.shape() != sym.shape() {
            return Err(Error::ShapeMismatch {
                expected: sym.shape().clone(),
                got: tensor.shape().clone(),
            });
        }
        let idx = sym.id() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        if self.slots[idx].is_some() {
            return Err(Error::DuplicateSymbol { id: sym.id() });
        }
        self.slots[idx] = Some(tensor);
        Ok(())
    }

    /// O(1) shared access by symbol.
    pub fn get(&self, sym: &Symbol) -> Result<&Tensor> {
        self.slots
            .get(sym.id() as usize)
            .and_then(|s| s.as_ref())
            .ok_or(Error::MissingTensor { id: sym.id() })
    }

    /// O(1) exclusive access by symbol.
    pub fn get_mut(&mut self, sym: &Symbol) -> Result<&mut Tensor> {
        self.slots
            .get_mut(sym.id() as usize)
            .and_then(|s| s.as_mut())
            .ok_or(Error::MissingTensor { id: sym.id() })
    }

    /// Move a tensor out of its slot so it can be mutated while other slots
    /// of the same store are borrowed. Pair with `restore`.
    pub fn take(&mut self, sym: &Symbol) -> Result<Tensor> {
        self.slots
            .get_mut(sym.id() as usize)
            .and_then(|s| s.take())
            .ok_or(Error::MissingTensor { id: sym.id() })
    }

    /// Put back a tensor taken with `take`.
    pub fn restore(&mut self, sym: &Symbol, tensor: Tensor) {
        let idx = sym.id() as usize;
        debug_assert!(idx < self.slots.len() && self.slots[idx].is_none());
        self.slots[idx] = Some(tensor);
    }

    /// Overwrite every resident tensor with a constant (gradient reset).
    pub fn fill_all(&mut self, value: crate::dtype::Elem) {
        for t in self.slots.iter_mut().flatten() {
            t.fill(value);
        }
    }
}

static TENSORS: Mutex<TensorStore> = Mutex::new(TensorStore::new());
static GRADS: Mutex<TensorStore> = Mutex::new(TensorStore::new());

/// Lock the activation arena.
pub fn tensors() -> MutexGuard<'static, TensorStore> {
    TENSORS.lock().expect("tensor arena lock poisoned")
}

/// Lock the gradient arena.
pub fn grads() -> MutexGuard<'static, TensorStore> {
    GRADS.lock().expect("gradient arena lock poisoned")
}

/// Clear both arenas and restart symbol numbering. Called when a Model is
/// constructed; outstanding symbols from earlier graphs become invalid.
pub fn clear_all() {
    tensors().clear();
    grads().clear();
    crate::symbol::reset_ids();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::symbol::{Symbol, SymbolKind};

    fn sym(shape: &[usize]) -> Symbol {
        Symbol::new(Shape::new(shape.to_vec()), false, SymbolKind::Input)
    }

    #[test]
    fn test_append_get_roundtrip() {
        let mut store = TensorStore::new();
        let s = sym(&[2, 2]);
        store.append(&s, Tensor::full((2, 2), 3.0)).unwrap();
        assert!(store.contains(&s));
        assert_eq!(store.get(&s).unwrap().to_vec(), vec![3.0; 4]);
        store.get_mut(&s).unwrap().fill(5.0);
        assert_eq!(store.get(&s).unwrap().to_vec(), vec![5.0; 4]);
    }

    #[test]
    fn test_duplicate_append_rejected() {
        let mut store = TensorStore::new();
        let s = sym(&[3]);
        store.append(&s, Tensor::zeros(3)).unwrap();
        assert!(matches!(
            store.append(&s, Tensor::zeros(3)),
            Err(Error::DuplicateSymbol { .. })
        ));
    }

    #[test]
    fn test_shape_checked_on_append() {
        let mut store = TensorStore::new();
        let s = sym(&[3]);
        assert!(matches!(
            store.append(&s, Tensor::zeros(4)),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_symbol() {
        let store = TensorStore::new();
        let s = sym(&[1]);
        assert!(matches!(store.get(&s), Err(Error::MissingTensor { .. })));
    }

    #[test]
    fn test_take_restore() {
        let mut store = TensorStore::new();
        let a = sym(&[2]);
        let b = sym(&[2]);
        store.append(&a, Tensor::full(2, 1.0)).unwrap();
        store.append(&b, Tensor::full(2, 2.0)).unwrap();

        let mut out = store.take(&a).unwrap();
        assert!(matches!(store.get(&a), Err(Error::MissingTensor { .. })));
        // Other slots stay readable while `out` is held.
        let src = store.get(&b).unwrap();
        out.copy_from(src).unwrap();
        store.restore(&a, out);
        assert_eq!(store.get(&a).unwrap().to_vec(), vec![2.0, 2.0]);
    }
}
