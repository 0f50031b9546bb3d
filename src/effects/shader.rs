//! Shader-driven postprocess stage

use crate::effects::traits::{EffectParams, EffectSource, Postprocess};
use crate::error::ComposeResult;
use crate::render::{EffectId, RenderBackend, TargetId};

/// A postprocess stage that runs one compiled effect program.
///
/// Construction compiles the program on the given backend; a compile
/// failure is logged with the effect label and returned.
#[derive(Debug)]
pub struct ShaderPostprocess {
    label: String,
    effect: EffectId,
    params: EffectParams,
}

impl ShaderPostprocess {
    pub fn new(backend: &mut dyn RenderBackend, source: &EffectSource) -> ComposeResult<Self> {
        let effect = backend.compile_effect(source).inspect_err(|e| {
            tracing::error!(
                effect = %source.label,
                backend = backend.name(),
                "Failed to compile effect: {e}"
            );
        })?;

        Ok(Self {
            label: source.label.to_string(),
            effect,
            params: EffectParams::default(),
        })
    }

    /// Parameter block uploaded on every run
    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut EffectParams {
        &mut self.params
    }

    pub fn set_float(&mut self, index: usize, value: f32) {
        self.params.set_float(index, value);
    }
}

impl Postprocess for ShaderPostprocess {
    fn label(&self) -> &str {
        &self.label
    }

    fn process(
        &mut self,
        backend: &mut dyn RenderBackend,
        input: TargetId,
        output: TargetId,
    ) -> ComposeResult<()> {
        backend.run_effect(self.effect, &self.params, input, output)
    }
}
