//! Frozen modules and scoped trainable views.
//!
//! A [`Frozen`] module keeps every float parameter out of gradient tracking.
//! [`Frozen::unfreeze`] hands out a [`Trainable`] guard that tracks gradients
//! while it lives and freezes the module again when dropped, including on an
//! early `?` return or a panic.

use burn::module::{AutodiffModule, ModuleMapper, Param};
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use std::marker::PhantomData;
use std::ops::Deref;

struct RequireGrad(bool);

impl<B: Backend> ModuleMapper<B> for RequireGrad {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let require_grad = self.0;
        param.map(|tensor| tensor.set_require_grad(require_grad))
    }
}

/// Set gradient tracking on every float parameter of `module`.
pub fn set_require_grad<B: Backend, M: Module<B>>(module: M, require_grad: bool) -> M {
    module.map(&mut RequireGrad(require_grad))
}

/// Module whose parameters do not require gradients.
#[derive(Debug)]
pub struct Frozen<B: AutodiffBackend, M: AutodiffModule<B>> {
    module: M,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> Frozen<B, M> {
    pub fn new(module: M) -> Self {
        Self {
            module: set_require_grad(module, false),
            _backend: PhantomData,
        }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    /// Track gradients on the module until the returned guard is dropped.
    pub fn unfreeze(&mut self) -> Trainable<'_, B, M> {
        self.module = set_require_grad(self.module.clone(), true);
        Trainable {
            module: &mut self.module,
            _backend: PhantomData,
        }
    }
}

/// Scoped trainable view over a [`Frozen`] module.
pub struct Trainable<'a, B: AutodiffBackend, M: AutodiffModule<B>> {
    module: &'a mut M,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> Trainable<'_, B, M> {
    pub fn module(&self) -> &M {
        self.module
    }

    /// Apply one optimizer step to the module.
    pub fn step<O: Optimizer<M, B>>(&mut self, optimizer: &mut O, lr: f64, grads: GradientsParams) {
        *self.module = optimizer.step(lr, self.module.clone(), grads);
    }
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> Deref for Trainable<'_, B, M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.module
    }
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> Drop for Trainable<'_, B, M> {
    fn drop(&mut self) {
        *self.module = set_require_grad(self.module.clone(), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscriminatorConfig;
    use crate::test_utils::{device, TestBackend};
    use burn::module::ModuleVisitor;

    struct RequireGradProbe {
        flags: Vec<bool>,
    }

    impl<B: Backend> ModuleVisitor<B> for RequireGradProbe {
        fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
            self.flags.push(param.val().is_require_grad());
        }
    }

    fn flags<M: Module<TestBackend>>(module: &M) -> Vec<bool> {
        let mut probe = RequireGradProbe { flags: Vec::new() };
        module.visit(&mut probe);
        probe.flags
    }

    fn fail_while_trainable(
        frozen: &mut Frozen<TestBackend, crate::model::Discriminator<TestBackend>>,
    ) -> anyhow::Result<()> {
        let trainable = frozen.unfreeze();
        assert!(flags(trainable.module()).iter().all(|flag| *flag));
        Err(anyhow::anyhow!("step failed"))
    }

    #[test]
    fn guard_refreezes_on_drop() {
        let device = device();
        let mut frozen = Frozen::new(DiscriminatorConfig::new(3, 4).init::<TestBackend>(&device));
        assert!(flags(frozen.module()).iter().all(|flag| !flag));

        {
            let trainable = frozen.unfreeze();
            assert!(flags(&*trainable).iter().all(|flag| *flag));
        }
        assert!(flags(frozen.module()).iter().all(|flag| !flag));
    }

    #[test]
    fn guard_refreezes_on_error() {
        let device = device();
        let mut frozen = Frozen::new(DiscriminatorConfig::new(3, 4).init::<TestBackend>(&device));

        assert!(fail_while_trainable(&mut frozen).is_err());
        assert!(flags(frozen.module()).iter().all(|flag| !flag));
    }
}
