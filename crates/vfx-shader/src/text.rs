//! Target-aware shader text builder.
//!
//! [`ShaderText`] is a line-oriented stream: [`ShaderText::new_line`] returns
//! a [`LineScope`] that collects fragments and writes the finished line
//! (with the current indentation and a trailing newline) when dropped.
//! [`Syntax`] is the pure vocabulary of the target language: type keywords,
//! literal constructors and intrinsic names.
//!
//! ```rust
//! use vfx_shader::{ShaderLanguage, ShaderText};
//!
//! let mut st = ShaderText::new(ShaderLanguage::HlslDx11);
//! let s = st.syntax();
//! st.new_line().push(s.float3_decl("gain")).push(" = ").push(s.float3_splat(2.0)).push(";");
//! st.indent();
//! st.line("outColor.rgb = outColor.rgb * gain;");
//!
//! assert_eq!(
//!     st.string(),
//!     "float3 gain = float3(2.0, 2.0, 2.0);\n  outColor.rgb = outColor.rgb * gain;\n"
//! );
//! ```

use std::fmt::Display;

use vfx_math::{HALF_MAX, HALF_NRM_MIN, double_literal, float_literal};

use crate::{ShaderError, ShaderLanguage, ShaderResult};

const TAB_SIZE: usize = 2;

// ============================================================================
// Vocabulary
// ============================================================================

/// Per-language keywords, literals and intrinsics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    lang: ShaderLanguage,
}

impl Syntax {
    /// Vocabulary for `lang`.
    pub fn new(lang: ShaderLanguage) -> Self {
        Self { lang }
    }

    /// Target language.
    pub fn language(&self) -> ShaderLanguage {
        self.lang
    }

    /// Scalar float keyword (`half` on Cg).
    pub fn float_kw(&self) -> &'static str {
        match self.lang {
            ShaderLanguage::Cg => "half",
            _ => "float",
        }
    }

    /// N-component vector keyword.
    pub fn vec_kw(&self, n: usize) -> String {
        match self.lang {
            l if l.is_glsl() => format!("vec{n}"),
            ShaderLanguage::Cg => format!("half{n}"),
            ShaderLanguage::Osl1 => match n {
                3 => "vector".to_string(),
                _ => format!("vector{n}"),
            },
            _ => format!("float{n}"),
        }
    }

    /// 2-vector keyword.
    pub fn float2_kw(&self) -> String {
        self.vec_kw(2)
    }

    /// 3-vector keyword.
    pub fn float3_kw(&self) -> String {
        self.vec_kw(3)
    }

    /// 4-vector keyword.
    pub fn float4_kw(&self) -> String {
        self.vec_kw(4)
    }

    /// Type of the pixel variable the shader function works on.
    pub fn pixel_kw(&self) -> String {
        match self.lang {
            ShaderLanguage::Osl1 => "color4".to_string(),
            _ => self.float4_kw(),
        }
    }

    /// `float name`.
    pub fn float_decl(&self, name: &str) -> String {
        format!("{} {name}", self.float_kw())
    }

    /// `vec2 name`.
    pub fn float2_decl(&self, name: &str) -> String {
        format!("{} {name}", self.float2_kw())
    }

    /// `vec3 name`.
    pub fn float3_decl(&self, name: &str) -> String {
        format!("{} {name}", self.float3_kw())
    }

    /// `vec4 name`.
    pub fn float4_decl(&self, name: &str) -> String {
        format!("{} {name}", self.float4_kw())
    }

    /// Float literal. Cg values are first clamped to the normal half range.
    pub fn flt(&self, v: f32) -> String {
        match self.lang {
            ShaderLanguage::Cg => float_literal(clamp_to_norm_half(v as f64) as f32),
            _ => float_literal(v),
        }
    }

    /// Full-precision literal of a double.
    pub fn dbl(&self, v: f64) -> String {
        match self.lang {
            ShaderLanguage::Cg => double_literal(clamp_to_norm_half(v)),
            _ => double_literal(v),
        }
    }

    /// `vec3(x, y, z)`.
    pub fn float3_const(&self, x: f32, y: f32, z: f32) -> String {
        self.float3_const_str(&self.flt(x), &self.flt(y), &self.flt(z))
    }

    /// `vec3(x, y, z)` from doubles.
    pub fn float3_const_f64(&self, v: [f64; 3]) -> String {
        self.float3_const_str(&self.dbl(v[0]), &self.dbl(v[1]), &self.dbl(v[2]))
    }

    /// `vec3(v, v, v)`.
    pub fn float3_splat(&self, v: f32) -> String {
        self.float3_splat_str(&self.flt(v))
    }

    /// `vec3(x, y, z)` from expressions.
    pub fn float3_const_str(&self, x: &str, y: &str, z: &str) -> String {
        format!("{}({x}, {y}, {z})", self.float3_kw())
    }

    /// `vec3(e, e, e)` from an expression.
    pub fn float3_splat_str(&self, v: &str) -> String {
        self.float3_const_str(v, v, v)
    }

    /// `vec4(x, y, z, w)`.
    pub fn float4_const(&self, x: f32, y: f32, z: f32, w: f32) -> String {
        self.float4_const_str(&self.flt(x), &self.flt(y), &self.flt(z), &self.flt(w))
    }

    /// `vec4(x, y, z, w)` from doubles.
    pub fn float4_const_f64(&self, v: [f64; 4]) -> String {
        self.float4_const_str(&self.dbl(v[0]), &self.dbl(v[1]), &self.dbl(v[2]), &self.dbl(v[3]))
    }

    /// `vec4(v, v, v, v)`.
    pub fn float4_splat(&self, v: f32) -> String {
        let s = self.flt(v);
        self.float4_const_str(&s, &s, &s, &s)
    }

    /// `vec4(x, y, z, w)` from expressions.
    pub fn float4_const_str(&self, x: &str, y: &str, z: &str, w: &str) -> String {
        format!("{}({x}, {y}, {z}, {w})", self.float4_kw())
    }

    /// Component `i` (0..4) of a pixel variable.
    pub fn pixel_component(&self, pixel: &str, i: usize) -> String {
        match (self.lang, i) {
            (ShaderLanguage::Osl1, 3) => format!("{pixel}.a"),
            (ShaderLanguage::Osl1, _) => format!("{pixel}.rgb[{i}]"),
            _ => format!("{pixel}.{}", RGBA[i & 3]),
        }
    }

    /// Component `i` (0..4) of a local vector.
    pub fn component(&self, expr: &str, i: usize) -> String {
        match self.lang {
            ShaderLanguage::Osl1 => format!("{expr}[{i}]"),
            _ => format!("{expr}.{}", RGBA[i & 3]),
        }
    }

    /// Linear blend intrinsic (`mix` or `lerp`).
    pub fn lerp(&self, x: &str, y: &str, a: &str) -> String {
        match self.lang {
            ShaderLanguage::Cg | ShaderLanguage::HlslDx11 => format!("lerp({x}, {y}, {a})"),
            _ => format!("mix({x}, {y}, {a})"),
        }
    }

    /// Two-argument arc tangent (`atan` in GLSL).
    pub fn atan2(&self, y: &str, x: &str) -> String {
        match self.lang {
            l if l.is_glsl() => format!("atan({y}, {x})"),
            _ => format!("atan2({y}, {x})"),
        }
    }

    /// Component-wise `a > b` as a 3-vector of 0/1.
    ///
    /// OSL has no vector comparison and raises.
    pub fn float3_greater_than(&self, a: &str, b: &str) -> ShaderResult<String> {
        let kw = self.float3_kw();
        match self.lang {
            ShaderLanguage::Osl1 => Err(ShaderError::unsupported(
                self.lang,
                "vector comparisons are not available",
            )),
            l if l.is_glsl() => Ok(format!("{kw}(greaterThan( {a}, {b}))")),
            ShaderLanguage::HlslDx11 | ShaderLanguage::Cg => Ok(format!(
                "{kw}(({a} > {b}) ? {} : {})",
                self.float3_splat(1.0),
                self.float3_splat(0.0)
            )),
            _ => Ok(format!("{kw}({a} > {b})")),
        }
    }

    /// Sampler paired with a texture.
    pub fn sampler_name(&self, texture: &str) -> String {
        sampler_name(texture)
    }

    /// 1D texture fetch.
    pub fn sample_tex1d(&self, texture: &str, coords: &str) -> String {
        self.sample_tex(1, texture, coords)
    }

    /// 2D texture fetch.
    pub fn sample_tex2d(&self, texture: &str, coords: &str) -> String {
        self.sample_tex(2, texture, coords)
    }

    /// 3D texture fetch.
    pub fn sample_tex3d(&self, texture: &str, coords: &str) -> String {
        self.sample_tex(3, texture, coords)
    }

    fn sample_tex(&self, n: usize, texture: &str, coords: &str) -> String {
        let sampler = sampler_name(texture);
        match self.lang {
            ShaderLanguage::Cg => format!("tex{n}D({sampler}, {coords})"),
            ShaderLanguage::HlslDx11 => format!("{texture}.Sample({sampler}, {coords})"),
            ShaderLanguage::Msl20 => format!("{texture}.sample({sampler}, {coords})"),
            l if l.has_generic_texture_call() => format!("texture({sampler}, {coords})"),
            _ => format!("texture{n}D({sampler}, {coords})"),
        }
    }

    /// `M * v` for a row-major 4x4 matrix, in the target's convention.
    ///
    /// GLSL and Metal constructors are column-major, so the values are
    /// transposed; HLSL multiplies a row vector by the transposed matrix.
    pub fn mat4_mul(&self, m: &[f64; 16], vec: &str) -> String {
        let rows = self.matrix_values(m, false);
        let cols = self.matrix_values(m, true);
        match self.lang {
            l if l.is_glsl() => format!("mat4({cols}) * {vec}"),
            ShaderLanguage::Cg => format!("mul(half4x4({rows}), {vec})"),
            ShaderLanguage::HlslDx11 => format!("mul({vec}, float4x4({cols}))"),
            ShaderLanguage::Msl20 => {
                let c: Vec<String> = (0..4)
                    .map(|col| {
                        self.float4_const_str(
                            &self.dbl(m[col]),
                            &self.dbl(m[4 + col]),
                            &self.dbl(m[8 + col]),
                            &self.dbl(m[12 + col]),
                        )
                    })
                    .collect();
                format!("float4x4({}) * {vec}", c.join(", "))
            }
            _ => format!("matrix({rows}) * {vec}"),
        }
    }

    fn matrix_values(&self, m: &[f64; 16], transpose: bool) -> String {
        (0..16)
            .map(|i| {
                let (line, col) = (i / 4, i % 4);
                let idx = if transpose { col * 4 + line } else { i };
                self.dbl(m[idx])
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

const RGBA: [&str; 4] = ["r", "g", "b", "a"];

/// Sampler name paired with a texture name.
pub fn sampler_name(texture: &str) -> String {
    format!("{texture}Sampler")
}

fn clamp_to_norm_half(v: f64) -> f64 {
    let (max, nrm_min) = (HALF_MAX as f64, HALF_NRM_MIN as f64);
    if v < -max {
        -max
    } else if v > -nrm_min && v < nrm_min {
        0.0
    } else if v > max {
        max
    } else {
        v
    }
}

// ============================================================================
// Text stream
// ============================================================================

/// Indented shader source text for one target language.
#[derive(Debug, Clone)]
pub struct ShaderText {
    syntax: Syntax,
    indent: usize,
    text: String,
}

/// One line under construction; written out when dropped.
pub struct LineScope<'a> {
    owner: &'a mut ShaderText,
    line: String,
}

impl LineScope<'_> {
    /// Appends any displayable fragment.
    pub fn push(mut self, v: impl Display) -> Self {
        self.line.push_str(&v.to_string());
        self
    }

    /// Appends a float literal.
    pub fn float(self, v: f32) -> Self {
        let s = self.owner.syntax.flt(v);
        self.push(s)
    }

    /// Appends a full-precision double literal.
    pub fn double(self, v: f64) -> Self {
        let s = self.owner.syntax.dbl(v);
        self.push(s)
    }
}

impl Drop for LineScope<'_> {
    fn drop(&mut self) {
        let line = std::mem::take(&mut self.line);
        self.owner.flush_line(&line);
    }
}

impl ShaderText {
    /// Empty text for `lang`.
    pub fn new(lang: ShaderLanguage) -> Self {
        Self { syntax: Syntax::new(lang), indent: 0, text: String::new() }
    }

    /// Vocabulary of the target language.
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Target language.
    pub fn language(&self) -> ShaderLanguage {
        self.syntax.lang
    }

    /// Increases indentation by one level.
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decreases indentation by one level.
    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Starts a new line.
    pub fn new_line(&mut self) -> LineScope<'_> {
        LineScope { owner: self, line: String::new() }
    }

    /// Writes a complete line.
    pub fn line(&mut self, v: impl Display) {
        self.new_line().push(v);
    }

    /// Accumulated text.
    pub fn string(&self) -> &str {
        &self.text
    }

    /// Consumes the builder, returning the text.
    pub fn into_string(self) -> String {
        self.text
    }

    fn flush_line(&mut self, line: &str) {
        if !line.is_empty() {
            self.text.push_str(&" ".repeat(TAB_SIZE * self.indent));
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    // ------------------------------------------------------------------
    // Variable declarations
    // ------------------------------------------------------------------

    /// `float name = value;`
    pub fn declare_var(&mut self, name: &str, value: f32) {
        let s = self.syntax;
        self.new_line().push(s.float_decl(name)).push(" = ").push(s.flt(value)).push(";");
    }

    /// `float name = expr;`
    pub fn declare_var_str(&mut self, name: &str, expr: &str) {
        let s = self.syntax;
        self.new_line().push(s.float_decl(name)).push(" = ").push(expr).push(";");
    }

    /// `vec3 name = vec3(x, y, z);`
    pub fn declare_float3(&mut self, name: &str, x: f32, y: f32, z: f32) {
        let s = self.syntax;
        self.new_line().push(s.float3_decl(name)).push(" = ").push(s.float3_const(x, y, z)).push(";");
    }

    /// `vec3 name = vec3(x, y, z);` from doubles.
    pub fn declare_float3_f64(&mut self, name: &str, v: [f64; 3]) {
        let s = self.syntax;
        self.new_line().push(s.float3_decl(name)).push(" = ").push(s.float3_const_f64(v)).push(";");
    }

    /// `vec3 name = expr;`
    pub fn declare_float3_str(&mut self, name: &str, expr: &str) {
        let s = self.syntax;
        self.new_line().push(s.float3_decl(name)).push(" = ").push(expr).push(";");
    }

    /// `vec4 name = vec4(x, y, z, w);`
    pub fn declare_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        let s = self.syntax;
        self.new_line().push(s.float4_decl(name)).push(" = ").push(s.float4_const(x, y, z, w)).push(";");
    }

    /// `const float name[N] = {...};` in the target's array syntax.
    pub fn declare_float_array_const(&mut self, name: &str, values: &[f32]) {
        let s = self.syntax;
        let items: Vec<String> = values.iter().map(|v| s.flt(*v)).collect();
        self.declare_array_const(s.float_kw(), name, &items);
    }

    /// `const int name[N] = {...};` in the target's array syntax.
    pub fn declare_int_array_const(&mut self, name: &str, values: &[i32]) {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.declare_array_const("int", name, &items);
    }

    fn declare_array_const(&mut self, kw: &str, name: &str, items: &[String]) {
        let n = items.len();
        let list = items.join(", ");
        let lang = self.language();
        let _ = match lang {
            l if l.is_glsl() => self.new_line().push(format!("const {kw} {name}[{n}] = {kw}[{n}]({list});")),
            ShaderLanguage::HlslDx11 => self.new_line().push(format!("static const {kw} {name}[{n}] = {{{list}}};")),
            ShaderLanguage::Osl1 => self.new_line().push(format!("{kw} {name}[{n}] = {{{list}}};")),
            _ => self.new_line().push(format!("const {kw} {name}[{n}] = {{{list}}};")),
        };
    }

    // ------------------------------------------------------------------
    // Uniforms
    // ------------------------------------------------------------------

    fn uniform_line(&mut self, decl: String) -> ShaderResult<()> {
        match self.language() {
            ShaderLanguage::Osl1 => Err(ShaderError::unsupported(
                ShaderLanguage::Osl1,
                "uniforms are not supported",
            )),
            ShaderLanguage::Msl20 => {
                self.line(format!("{decl};"));
                Ok(())
            }
            _ => {
                self.line(format!("uniform {decl};"));
                Ok(())
            }
        }
    }

    /// Declares a float uniform.
    pub fn declare_uniform_float(&mut self, name: &str) -> ShaderResult<()> {
        self.uniform_line(format!("float {name}"))
    }

    /// Declares a bool uniform.
    pub fn declare_uniform_bool(&mut self, name: &str) -> ShaderResult<()> {
        self.uniform_line(format!("bool {name}"))
    }

    /// Declares a float array uniform of `size` elements.
    pub fn declare_uniform_array_float(&mut self, name: &str, size: usize) -> ShaderResult<()> {
        self.uniform_line(format!("float {name}[{size}]"))
    }

    /// Declares an int array uniform of `size` elements.
    pub fn declare_uniform_array_int(&mut self, name: &str, size: usize) -> ShaderResult<()> {
        self.uniform_line(format!("int {name}[{size}]"))
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Declares a 1D texture and its sampler.
    ///
    /// OpenGL ES has no 1D textures; OSL has no textures at all.
    pub fn declare_tex1d(&mut self, name: &str) -> ShaderResult<()> {
        if self.language().is_glsl_es() {
            return Err(ShaderError::unsupported(
                self.language(),
                "1D textures are not supported by OpenGL ES",
            ));
        }
        self.declare_tex(1, name)
    }

    /// Declares a 2D texture and its sampler.
    pub fn declare_tex2d(&mut self, name: &str) -> ShaderResult<()> {
        self.declare_tex(2, name)
    }

    /// Declares a 3D texture and its sampler.
    pub fn declare_tex3d(&mut self, name: &str) -> ShaderResult<()> {
        self.declare_tex(3, name)
    }

    fn declare_tex(&mut self, n: usize, name: &str) -> ShaderResult<()> {
        let sampler = sampler_name(name);
        match self.language() {
            ShaderLanguage::Osl1 => {
                return Err(ShaderError::unsupported(
                    ShaderLanguage::Osl1,
                    format!("textures are not supported (needed for '{name}')"),
                ));
            }
            ShaderLanguage::HlslDx11 => {
                self.line(format!("Texture{n}D<float4> {name};"));
                self.line(format!("SamplerState {sampler};"));
            }
            ShaderLanguage::Msl20 => {
                self.line(format!("texture{n}d<float> {name};"));
                self.line(format!("sampler {sampler};"));
            }
            l if l.is_glsl_es() && n == 3 => {
                self.line(format!("uniform highp sampler3D {sampler};"));
            }
            _ => {
                self.line(format!("uniform sampler{n}D {sampler};"));
            }
        }
        Ok(())
    }
}
