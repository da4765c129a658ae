//! GPU shader emission.
//!
//! Each op appends a scoped block to the creator's function body and, when
//! it needs them, helper functions, textures and uniforms:
//!
//! ```text
//!
//! // Add <Op> processing
//!
//! {
//!     ...statements on the pixel variable...
//! }
//! ```
//!
//! The emitters mirror the CPU renderers in [`crate::cpu`]; where a kind
//! cannot be expressed in the target language the emitter returns
//! [`OpsError::UnsupportedLanguage`](crate::OpsError::UnsupportedLanguage).

mod basic;
mod curves;
mod fixed_function;
mod log;
mod lut;

use tracing::trace;
use vfx_shader::{ShaderCreator, ShaderText};

use crate::OpsResult;
use crate::data::{OpData, Payload};
use crate::optimizer::FinalizeFlags;

/// Appends the code of one finalized op to `creator`.
pub(crate) fn extract(
    data: &OpData,
    flags: &FinalizeFlags,
    creator: &mut ShaderCreator,
) -> OpsResult<()> {
    trace!(op = data.kind().tag(), language = %creator.language(), "gpu::extract");
    let cache_id = data.cache_id().unwrap_or_default();
    match &data.payload {
        Payload::Matrix(d) => basic::matrix(d, creator),
        Payload::Exponent(d) => basic::exponent(d, creator),
        Payload::Range(d) => basic::range(d, creator),
        Payload::Cdl(d) => basic::cdl(d, creator),
        Payload::Log(d) => log::log(d, creator),
        Payload::Lut1D(d) => lut::lut1d(d, cache_id, creator),
        Payload::Lut3D(d) => lut::lut3d(d, flags.lut_inverse, cache_id, creator),
        Payload::FixedFunction(d) => fixed_function::fixed_function(d, creator),
        Payload::GradingRgbCurve(d) => curves::rgb_curve(d, creator),
        Payload::GradingHueCurve(d) => curves::hue_curve(d, creator),
    }
}

// ============================================================================
// Block helpers
// ============================================================================

/// Function-body text for one op, already inside its `{ }` scope.
pub(super) struct OpBlock {
    st: ShaderText,
}

impl OpBlock {
    /// Opens a block titled `// <title>`.
    pub(super) fn open(creator: &ShaderCreator, title: &str) -> Self {
        let mut st = creator.new_text();
        st.indent();
        st.line("");
        st.line(format!("// {title}"));
        st.line("");
        st.line("{");
        st.indent();
        Self { st }
    }

    pub(super) fn text(&mut self) -> &mut ShaderText {
        &mut self.st
    }

    /// Closes the scope and appends the block to the function body.
    pub(super) fn close(mut self, creator: &mut ShaderCreator) -> OpsResult<()> {
        self.st.dedent();
        self.st.line("}");
        self.st.dedent();
        creator.add_to_function_code(self.st.string())?;
        Ok(())
    }
}

/// `pix.rgb`.
#[inline]
pub(super) fn rgb(pix: &str) -> String {
    format!("{pix}.rgb")
}

#[cfg(test)]
pub(crate) mod test_util {
    use vfx_shader::{ShaderCreator, ShaderLanguage};

    use crate::OpsResult;
    use crate::data::OpData;
    use crate::op::Op;
    use crate::optimizer::FinalizeFlags;

    /// Finalizes `data` and emits it into a fresh creator.
    pub(crate) fn emit_with(
        data: impl Into<OpData>,
        flags: FinalizeFlags,
        lang: ShaderLanguage,
    ) -> OpsResult<ShaderCreator> {
        let mut op = Op::new(data.into());
        op.finalize(&flags)?;
        let mut creator = ShaderCreator::for_language(lang);
        creator.begin()?;
        op.extract_gpu_shader_info(&mut creator)?;
        Ok(creator)
    }

    /// Function code of `data` emitted for `lang`.
    pub(crate) fn emit(data: impl Into<OpData>, lang: ShaderLanguage) -> String {
        emit_with(data, FinalizeFlags::default(), lang).unwrap().function_code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use crate::OpsError;
    use crate::data::{ExponentData, Lut3DData};
    use crate::optimizer::FinalizeFlags;
    use vfx_shader::ShaderLanguage;

    #[test]
    fn test_blocks_are_scoped() {
        let code = emit(ExponentData::uniform(2.2), ShaderLanguage::Glsl40);
        assert!(code.contains("// Add Exponent processing"));
        assert_eq!(code.matches('{').count(), code.matches('}').count());
    }

    #[test]
    fn test_cache_id_recorded() {
        let creator =
            emit_with(ExponentData::uniform(2.2), FinalizeFlags::default(), ShaderLanguage::Glsl40)
                .unwrap();
        let a = creator.cache_id();
        let other =
            emit_with(ExponentData::uniform(2.4), FinalizeFlags::default(), ShaderLanguage::Glsl40)
                .unwrap();
        assert_ne!(a, other.cache_id());
    }

    #[test]
    fn test_errors_name_the_op() {
        let err = emit_with(Lut3DData::identity(5), FinalizeFlags::default(), ShaderLanguage::Osl1)
            .unwrap_err();
        match err {
            OpsError::UnsupportedLanguage { op, .. } => assert_eq!(op, "Lut3DOp"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
