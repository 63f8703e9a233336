use crate::error::{OptimError, Result};

/// One tracked tensor, flattened: the value buffer plus a gradient slot.
///
/// The gradient slot starts empty and stays empty until a differentiation
/// pass writes it; zeroing preserves presence. The buffer length is the
/// parameter's whole shape contract, fixed for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    value: Vec<f32>,
    grad: Option<Vec<f32>>,
}

impl Parameter {
    fn new(value: Vec<f32>) -> Self {
        Self { value, grad: None }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    #[inline]
    pub fn value(&self) -> &[f32] {
        &self.value
    }

    /// `None` until a gradient has been written for this parameter.
    #[inline]
    pub fn grad(&self) -> Option<&[f32]> {
        self.grad.as_deref()
    }
}

/// Caller-owned, index-addressed registry of the parameters an optimizer
/// drives.
///
/// Identity is the index returned by [`ParamSet::push`], stable for the
/// set's lifetime. The caller mutates values directly only for the
/// projection applied between an extrapolation and the next
/// differentiation pass; every other value mutation goes through the
/// optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    params: Vec<Parameter>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter and returns its stable index.
    pub fn push(&mut self, value: Vec<f32>) -> usize {
        self.params.push(Parameter::new(value));
        self.params.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    /// # Panics
    /// Panics if `param` is out of range.
    #[inline]
    pub fn value(&self, param: usize) -> &[f32] {
        &self.params[param].value
    }

    /// Mutable view of a parameter's value, for the caller-side projection.
    ///
    /// # Panics
    /// Panics if `param` is out of range.
    #[inline]
    pub fn value_mut(&mut self, param: usize) -> &mut [f32] {
        &mut self.params[param].value
    }

    /// `None` while no gradient has been written for `param`.
    ///
    /// # Panics
    /// Panics if `param` is out of range.
    #[inline]
    pub fn grad(&self, param: usize) -> Option<&[f32]> {
        self.params[param].grad.as_deref()
    }

    /// Replaces `param`'s gradient slot wholesale.
    ///
    /// Length is not checked here: the slot is plain storage for the
    /// differentiation pass, and shape validation happens at the start of
    /// the optimizer call that consumes it.
    ///
    /// # Panics
    /// Panics if `param` is out of range.
    pub fn set_grad(&mut self, param: usize, grad: Vec<f32>) {
        self.params[param].grad = Some(grad);
    }

    /// Adds into `param`'s gradient slot, allocating zeros on first use.
    ///
    /// # Errors
    /// [`OptimError::ShapeMismatch`] when `grad`'s length differs from the
    /// parameter's.
    ///
    /// # Panics
    /// Panics if `param` is out of range.
    pub fn accumulate_grad(&mut self, param: usize, grad: &[f32]) -> Result<()> {
        let p = &mut self.params[param];
        let len = p.value.len();
        if grad.len() != len {
            return Err(OptimError::ShapeMismatch {
                param,
                got: grad.len(),
                expected: len,
            });
        }
        let slot = p.grad.get_or_insert_with(|| vec![0.0; len]);
        for (s, g) in slot.iter_mut().zip(grad) {
            *s += *g;
        }
        Ok(())
    }

    /// Zeroes every gradient that exists; slots never written stay empty.
    /// Idempotent.
    pub fn zero_grad(&mut self) {
        for p in &mut self.params {
            if let Some(g) = p.grad.as_mut() {
                g.fill(0.0);
            }
        }
    }
}
