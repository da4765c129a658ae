//! Shader creator: accumulates the pieces of one shader program.
//!
//! Ops append declarations (textures, uniforms), helper functions and body
//! code; the creator tracks textures and uniforms the embedder must bind and
//! hands out unique resource names. [`ShaderCreator::finalize`] assembles
//! the final text and applies the class wrapper of the target language.
//!
//! Assembly follows a fixed order:
//!
//! ```text
//! Fresh --begin()--> BodyOpen --finalize()--> BodyClosed --> Wrapped
//! ```
//!
//! Declarations, helpers, textures and uniforms may be added while `Fresh`
//! or `BodyOpen`; body code only while `BodyOpen`.

use std::fmt;

use tracing::{debug, trace};

use crate::wrapper::{ShaderParts, wrap_shader};
use crate::{
    DynamicPropertyType, ShaderDesc, ShaderError, ShaderLanguage, ShaderResult, ShaderText, Syntax,
};

// ============================================================================
// Registry entries
// ============================================================================

/// Assembly state of a [`ShaderCreator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Nothing emitted into the body yet.
    Fresh,
    /// Body accepts function code.
    BodyOpen,
    /// Body closed, helpers and declarations prepended.
    BodyClosed,
    /// Class wrapper applied; the text is final.
    Wrapped,
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    /// 1D texture.
    Tex1D,
    /// 2D texture (also used for long 1D LUTs).
    Tex2D,
    /// 3D texture.
    Tex3D,
}

/// Channel layout of texture data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureChannel {
    /// One float per texel.
    Red,
    /// Three floats per texel.
    Rgb,
}

impl TextureChannel {
    /// Floats per texel.
    pub fn count(&self) -> usize {
        match self {
            TextureChannel::Red => 1,
            TextureChannel::Rgb => 3,
        }
    }
}

/// Sampler filtering the embedder should configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    /// Nearest texel.
    Nearest,
    /// Hardware linear filtering.
    #[default]
    Linear,
}

/// A texture the embedder must upload and bind.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    /// Texture name in the shader.
    pub name: String,
    /// Sampler name in the shader.
    pub sampler_name: String,
    /// Cache-ID of the op the data came from, for texture reuse.
    pub cache_id: String,
    /// Width in texels.
    pub width: usize,
    /// Height in texels (1 for 1D).
    pub height: usize,
    /// Depth in texels (1 for 1D/2D).
    pub depth: usize,
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Channel layout.
    pub channel: TextureChannel,
    /// Filtering.
    pub filter: TextureFilter,
    /// Texel data, `width * height * depth * channel.count()` floats.
    pub values: Vec<f32>,
}

/// Value source of a uniform, called by the embedder at bind time.
pub enum UniformGetter {
    /// Scalar float.
    Float(Box<dyn Fn() -> f64 + Send + Sync>),
    /// Boolean.
    Bool(Box<dyn Fn() -> bool + Send + Sync>),
    /// Float array.
    FloatArray(Box<dyn Fn() -> Vec<f32> + Send + Sync>),
    /// Int array.
    IntArray(Box<dyn Fn() -> Vec<i32> + Send + Sync>),
}

impl fmt::Debug for UniformGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            UniformGetter::Float(_) => "Float",
            UniformGetter::Bool(_) => "Bool",
            UniformGetter::FloatArray(_) => "FloatArray",
            UniformGetter::IntArray(_) => "IntArray",
        };
        write!(f, "UniformGetter::{kind}")
    }
}

/// Current value of a uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Scalar float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Float array.
    FloatArray(Vec<f32>),
    /// Int array.
    IntArray(Vec<i32>),
}

/// A uniform the embedder must bind.
#[derive(Debug)]
pub struct GpuUniform {
    /// Uniform name in the shader.
    pub name: String,
    /// Value source.
    pub getter: UniformGetter,
    /// Dynamic property the value tracks, if any.
    pub dynamic: Option<DynamicPropertyType>,
}

impl GpuUniform {
    /// Reads the current value.
    pub fn value(&self) -> UniformValue {
        match &self.getter {
            UniformGetter::Float(g) => UniformValue::Float(g()),
            UniformGetter::Bool(g) => UniformValue::Bool(g()),
            UniformGetter::FloatArray(g) => UniformValue::FloatArray(g()),
            UniformGetter::IntArray(g) => UniformValue::IntArray(g()),
        }
    }
}

// ============================================================================
// Creator
// ============================================================================

/// Accumulates shader code, textures and uniforms for one shader program.
#[derive(Debug)]
pub struct ShaderCreator {
    desc: ShaderDesc,
    state: AssemblyState,
    resource_index: usize,
    declare_code: String,
    helper_code: String,
    function_code: String,
    textures: Vec<GpuTexture>,
    uniforms: Vec<GpuUniform>,
    dynamic_properties: Vec<DynamicPropertyType>,
    op_cache_ids: Vec<String>,
    shader_text: String,
}

impl ShaderCreator {
    /// Creates an empty creator for `desc`.
    pub fn new(desc: ShaderDesc) -> Self {
        Self {
            desc,
            state: AssemblyState::Fresh,
            resource_index: 0,
            declare_code: String::new(),
            helper_code: String::new(),
            function_code: String::new(),
            textures: Vec::new(),
            uniforms: Vec::new(),
            dynamic_properties: Vec::new(),
            op_cache_ids: Vec::new(),
            shader_text: String::new(),
        }
    }

    /// Creator with default settings for `language`.
    pub fn for_language(language: ShaderLanguage) -> Self {
        Self::new(ShaderDesc::new(language))
    }

    /// Shader description.
    pub fn desc(&self) -> &ShaderDesc {
        &self.desc
    }

    /// Replaces the wrapper class name. Allowed until the shader is wrapped.
    pub fn set_class_name(&mut self, name: impl Into<String>) -> ShaderResult<()> {
        if self.state == AssemblyState::Wrapped {
            return Err(ShaderError::Assembly("cannot rename the class of a wrapped shader".into()));
        }
        self.desc.class_name = name.into();
        Ok(())
    }

    /// Target language.
    pub fn language(&self) -> ShaderLanguage {
        self.desc.language
    }

    /// Vocabulary of the target language.
    pub fn syntax(&self) -> Syntax {
        Syntax::new(self.desc.language)
    }

    /// Fresh text builder for the target language.
    pub fn new_text(&self) -> ShaderText {
        ShaderText::new(self.desc.language)
    }

    /// Pixel variable name.
    pub fn pixel_name(&self) -> &str {
        &self.desc.pixel_name
    }

    /// Resource name prefix.
    pub fn resource_prefix(&self) -> &str {
        &self.desc.resource_prefix
    }

    /// Largest texture width.
    pub fn texture_max_width(&self) -> usize {
        self.desc.texture_max_width
    }

    /// True when 1D textures may be declared.
    pub fn allow_texture_1d(&self) -> bool {
        self.desc.allow_texture_1d && !self.desc.language.is_glsl_es()
    }

    /// Current assembly state.
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Opens the function body.
    pub fn begin(&mut self) -> ShaderResult<()> {
        if self.state != AssemblyState::Fresh {
            return Err(ShaderError::Assembly(format!(
                "cannot open the function body in state {:?}",
                self.state
            )));
        }
        trace!(language = %self.desc.language, "shader::begin");
        self.state = AssemblyState::BodyOpen;
        Ok(())
    }

    /// Returns the next resource index (monotone).
    pub fn next_resource_index(&mut self) -> usize {
        let idx = self.resource_index;
        self.resource_index += 1;
        idx
    }

    /// Builds a unique resource name `prefix_base_index`.
    ///
    /// Double underscores are collapsed since GLSL reserves them.
    pub fn resource_name(&mut self, base: &str) -> String {
        let idx = self.next_resource_index();
        collapse_underscores(format!("{}_{}_{}", self.desc.resource_prefix, base, idx))
    }

    /// Builds a resource name `prefix_base` without an index.
    ///
    /// Used for resources shared by every op bound to the same dynamic
    /// property, so the name must not depend on emission order.
    pub fn shared_resource_name(&self, base: &str) -> String {
        collapse_underscores(format!("{}_{}", self.desc.resource_prefix, base))
    }

    fn ensure_declarable(&self, what: &str) -> ShaderResult<()> {
        match self.state {
            AssemblyState::Fresh | AssemblyState::BodyOpen => Ok(()),
            state => Err(ShaderError::Assembly(format!("cannot add {what} in state {state:?}"))),
        }
    }

    /// Appends to the declaration section.
    pub fn add_to_declare_code(&mut self, code: &str) -> ShaderResult<()> {
        self.ensure_declarable("declarations")?;
        self.declare_code.push_str(code);
        Ok(())
    }

    /// Appends to the helper function section.
    pub fn add_to_helper_code(&mut self, code: &str) -> ShaderResult<()> {
        self.ensure_declarable("helper code")?;
        self.helper_code.push_str(code);
        Ok(())
    }

    /// Appends to the function body.
    pub fn add_to_function_code(&mut self, code: &str) -> ShaderResult<()> {
        if self.state != AssemblyState::BodyOpen {
            return Err(ShaderError::Assembly(format!(
                "function code requires an open body (state {:?})",
                self.state
            )));
        }
        self.function_code.push_str(code);
        Ok(())
    }

    /// Registers a texture.
    pub fn add_texture(&mut self, texture: GpuTexture) -> ShaderResult<()> {
        self.ensure_declarable("textures")?;
        if self.desc.language == ShaderLanguage::Osl1 {
            return Err(ShaderError::UnsupportedLanguage {
                language: ShaderLanguage::Osl1,
                message: format!("textures are not supported (needed for '{}')", texture.name),
            });
        }
        let (w, h, d) = (texture.width, texture.height, texture.depth);
        if w == 0 || h == 0 || d == 0 {
            return Err(ShaderError::Range(format!(
                "texture '{}' has an empty dimension ({w}x{h}x{d})",
                texture.name
            )));
        }
        if texture.dimension != TextureDimension::Tex3D && w > self.desc.texture_max_width {
            return Err(ShaderError::Range(format!(
                "texture '{}' width {w} exceeds the maximum {}",
                texture.name, self.desc.texture_max_width
            )));
        }
        let expected = w * h * d * texture.channel.count();
        if texture.values.len() != expected {
            return Err(ShaderError::Range(format!(
                "texture '{}' holds {} values, expected {expected}",
                texture.name,
                texture.values.len()
            )));
        }
        self.textures.push(texture);
        Ok(())
    }

    /// Registers a uniform. Returns false if the name is already bound.
    pub fn add_uniform(
        &mut self,
        name: &str,
        getter: UniformGetter,
        dynamic: Option<DynamicPropertyType>,
    ) -> ShaderResult<bool> {
        self.ensure_declarable("uniforms")?;
        if self.uniforms.iter().any(|u| u.name == name) {
            return Ok(false);
        }
        self.uniforms.push(GpuUniform { name: name.to_string(), getter, dynamic });
        Ok(true)
    }

    /// Records a dynamic property binding. Returns false if already bound.
    pub fn add_dynamic_property(&mut self, property: DynamicPropertyType) -> bool {
        if self.dynamic_properties.contains(&property) {
            return false;
        }
        self.dynamic_properties.push(property);
        true
    }

    /// True if `property` is bound.
    pub fn has_dynamic_property(&self, property: DynamicPropertyType) -> bool {
        self.dynamic_properties.contains(&property)
    }

    /// Bound dynamic properties, in binding order.
    pub fn dynamic_properties(&self) -> &[DynamicPropertyType] {
        &self.dynamic_properties
    }

    /// Records the cache-ID of an op whose code was appended.
    pub fn add_op_cache_id(&mut self, cache_id: &str) {
        self.op_cache_ids.push(cache_id.to_string());
    }

    /// Registered textures, in index order.
    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    /// Registered uniforms, in declaration order.
    pub fn uniforms(&self) -> &[GpuUniform] {
        &self.uniforms
    }

    /// Uniform by name.
    pub fn uniform(&self, name: &str) -> Option<&GpuUniform> {
        self.uniforms.iter().find(|u| u.name == name)
    }

    /// Declaration code accumulated so far.
    pub fn declare_code(&self) -> &str {
        &self.declare_code
    }

    /// Helper code accumulated so far.
    pub fn helper_code(&self) -> &str {
        &self.helper_code
    }

    /// Body code accumulated so far.
    pub fn function_code(&self) -> &str {
        &self.function_code
    }

    /// Closes the body and produces the wrapped shader text.
    ///
    /// A wrapper error (such as an invalid class name) leaves the body open.
    pub fn finalize(&mut self) -> ShaderResult<&str> {
        if self.state != AssemblyState::BodyOpen {
            return Err(ShaderError::Assembly(format!(
                "cannot finalize in state {:?}",
                self.state
            )));
        }
        trace!(
            language = %self.desc.language,
            textures = self.textures.len(),
            uniforms = self.uniforms.len(),
            "shader::finalize"
        );

        let function = self.function_text();
        self.state = AssemblyState::BodyClosed;

        let parts = ShaderParts {
            declare_code: &self.declare_code,
            helper_code: &self.helper_code,
            function_code: &function,
        };
        match wrap_shader(&self.desc, &parts) {
            Ok(text) => self.shader_text = text,
            Err(e) => {
                // Reopen so the shader can be finalized again.
                self.state = AssemblyState::BodyOpen;
                return Err(e);
            }
        }
        self.state = AssemblyState::Wrapped;

        debug!(
            language = %self.desc.language,
            bytes = self.shader_text.len(),
            "Finalized shader"
        );
        Ok(&self.shader_text)
    }

    /// Final text, once wrapped.
    pub fn shader_text(&self) -> Option<&str> {
        (self.state == AssemblyState::Wrapped).then_some(self.shader_text.as_str())
    }

    /// Identifier of this shader program, for caching compiled shaders.
    ///
    /// Folds in the language, naming settings, the op cache-IDs, texture
    /// cache-IDs and uniform names.
    pub fn cache_id(&self) -> String {
        let mut id = format!(
            "{} {} {} {} {}",
            self.desc.language,
            self.desc.resource_prefix,
            self.desc.function_name,
            self.desc.pixel_name,
            self.desc.class_name
        );
        for op in &self.op_cache_ids {
            id.push_str(&format!(" [{op}]"));
        }
        for t in &self.textures {
            id.push_str(&format!(" {}:{}", t.name, t.cache_id));
        }
        for u in &self.uniforms {
            id.push(' ');
            id.push_str(&u.name);
        }
        id
    }

    fn function_text(&self) -> String {
        let s = self.syntax();
        let pixel_kw = s.pixel_kw();
        let mut st = self.new_text();
        st.line("");
        st.line("// Declaration of the OCIO shader function");
        st.line("");
        st.new_line()
            .push(&pixel_kw)
            .push(" ")
            .push(&self.desc.function_name)
            .push("(")
            .push(&pixel_kw)
            .push(" inPixel)");
        st.line("{");
        st.indent();
        st.new_line().push(&pixel_kw).push(" ").push(&self.desc.pixel_name).push(" = inPixel;");
        let mut text = st.into_string();
        text.push_str(&self.function_code);

        let mut st = self.new_text();
        st.line("");
        st.indent();
        st.new_line().push("return ").push(&self.desc.pixel_name).push(";");
        st.dedent();
        st.line("}");
        text.push_str(st.string());
        text
    }
}

fn collapse_underscores(mut name: String) -> String {
    while name.contains("__") {
        name = name.replace("__", "_");
    }
    name
}
