//! Per-language class wrappers.
//!
//! GLSL, HLSL and Cg accept the emitted free function as is. Metal has no
//! global resources, so textures, samplers and uniforms become members of a
//! struct whose constructor copies them in; a free function with the
//! requested name constructs the struct and forwards the pixel. OSL gets a
//! fixed header (vector4/color4 includes and the operators the body relies
//! on) and a `shader` block calling the function.

use crate::{ShaderDesc, ShaderError, ShaderLanguage, ShaderResult, ShaderText};

/// The three sections of an assembled shader.
#[derive(Debug, Clone, Copy)]
pub struct ShaderParts<'a> {
    /// Textures, samplers and uniforms.
    pub declare_code: &'a str,
    /// Helper functions and constant tables.
    pub helper_code: &'a str,
    /// The complete shader function, header included.
    pub function_code: &'a str,
}

/// Wraps the assembled sections for the target of `desc`.
pub fn wrap_shader(desc: &ShaderDesc, parts: &ShaderParts<'_>) -> ShaderResult<String> {
    match desc.language {
        ShaderLanguage::Msl20 => wrap_msl(desc, parts),
        ShaderLanguage::Osl1 => wrap_osl(desc, parts),
        _ => Ok(plain_text(parts)),
    }
}

fn plain_text(parts: &ShaderParts<'_>) -> String {
    let mut text = String::new();
    if !parts.declare_code.is_empty() {
        text.push_str("\n// Declaration of all variables\n\n");
        text.push_str(parts.declare_code);
    }
    if !parts.helper_code.is_empty() {
        text.push_str("\n// Declaration of all helper methods\n\n");
        text.push_str(parts.helper_code);
    }
    text.push_str(parts.function_code);
    text
}

fn validate_class_name(desc: &ShaderDesc) -> ShaderResult<()> {
    let name = &desc.class_name;
    let valid = match name.chars().next() {
        None => false,
        Some(c) if c.is_ascii_digit() => false,
        Some(_) => name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
    };
    if valid {
        Ok(())
    } else {
        Err(ShaderError::UnsupportedLanguage {
            language: desc.language,
            message: format!("invalid class name '{name}'"),
        })
    }
}

// ============================================================================
// Metal
// ============================================================================

/// A resource captured as struct member and constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MslParam {
    ty: String,
    name: String,
    array_len: Option<String>,
}

impl MslParam {
    /// Constructor/free-function parameter declaration(s).
    fn params(&self) -> Vec<String> {
        match &self.array_len {
            Some(_) => vec![
                format!("constant {}* {}", self.ty, self.name),
                format!("int {}_count", self.name),
            ],
            None => vec![format!("{} {}", self.ty, self.name)],
        }
    }

    /// Arguments forwarded by the free function.
    fn args(&self) -> Vec<String> {
        match &self.array_len {
            Some(_) => vec![self.name.clone(), format!("{}_count", self.name)],
            None => vec![self.name.clone()],
        }
    }
}

/// Parses top-level `type name;` / `type name[N];` declarations.
///
/// Lines with an initializer or a body are not resources and are skipped.
fn parse_msl_params(declare_code: &str) -> Vec<MslParam> {
    declare_code
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//"))
        .filter(|l| l.ends_with(';') && !l.contains('=') && !l.contains('('))
        .filter_map(|l| {
            let decl = l.trim_end_matches(';').trim();
            let (ty, name) = decl.rsplit_once(char::is_whitespace)?;
            let (name, array_len) = match name.split_once('[') {
                Some((n, rest)) => (n, Some(rest.trim_end_matches(']').to_string())),
                None => (name, None),
            };
            Some(MslParam { ty: ty.trim().to_string(), name: name.to_string(), array_len })
        })
        .collect()
}

fn wrap_msl(desc: &ShaderDesc, parts: &ShaderParts<'_>) -> ShaderResult<String> {
    validate_class_name(desc)?;
    let class = &desc.class_name;
    let params = parse_msl_params(parts.declare_code);
    let param_decls: Vec<String> = params.iter().flat_map(MslParam::params).collect();
    let args: Vec<String> = params.iter().flat_map(MslParam::args).collect();

    let mut st = ShaderText::new(ShaderLanguage::Msl20);
    st.line("#include <metal_stdlib>");
    st.line("#include <simd/simd.h>");
    st.line("");
    st.line("using namespace metal;");
    st.line("");
    st.line("");
    st.line("// Declaration of class wrapper");
    st.line("");
    st.line(format!("struct {class}"));
    st.line("{");
    st.indent();
    st.new_line().push(class).push("(").push(param_decls.join(", ")).push(")");
    st.line("{");
    st.indent();
    for p in &params {
        match &p.array_len {
            Some(_) => {
                st.new_line()
                    .push(format!("for(int i = 0; i < {}_count; ++i)", p.name));
                st.line("{");
                st.indent();
                st.new_line().push(format!("this->{0}[i] = {0}[i];", p.name));
                st.dedent();
                st.line("}");
            }
            None => {
                st.new_line().push(format!("this->{0} = {0};", p.name));
            }
        }
    }
    st.dedent();
    st.line("}");
    st.dedent();

    let mut text = st.into_string();
    text.push_str(&plain_text(parts));

    let pixel_kw = "float4";
    let mut st = ShaderText::new(ShaderLanguage::Msl20);
    st.line("");
    st.line("};");
    st.line("");
    let mut fn_params = param_decls;
    fn_params.push(format!("{pixel_kw} inPixel"));
    st.new_line()
        .push(pixel_kw)
        .push(" ")
        .push(&desc.function_name)
        .push("(")
        .push(fn_params.join(", "))
        .push(")");
    st.line("{");
    st.indent();
    st.new_line()
        .push("return ")
        .push(class)
        .push("(")
        .push(args.join(", "))
        .push(").")
        .push(&desc.function_name)
        .push("(inPixel);");
    st.dedent();
    st.line("}");
    text.push_str(st.string());
    Ok(text)
}

// ============================================================================
// OSL
// ============================================================================

const OSL_HEADER: &str = r#"
/* All the includes */

#include "vector4.h"
#include "color4.h"

/* All the generic helper methods */

vector4 __operator__mul__(matrix m, vector4 v)
{
  return vector4(v.x * m[0][0] + v.y * m[0][1] + v.z * m[0][2] + v.w * m[0][3],
                 v.x * m[1][0] + v.y * m[1][1] + v.z * m[1][2] + v.w * m[1][3],
                 v.x * m[2][0] + v.y * m[2][1] + v.z * m[2][2] + v.w * m[2][3],
                 v.x * m[3][0] + v.y * m[3][1] + v.z * m[3][2] + v.w * m[3][3]);
}

vector4 __operator__mul__(vector4 v, matrix m)
{
  return vector4(v.x * m[0][0] + v.y * m[1][0] + v.z * m[2][0] + v.w * m[3][0],
                 v.x * m[0][1] + v.y * m[1][1] + v.z * m[2][1] + v.w * m[3][1],
                 v.x * m[0][2] + v.y * m[1][2] + v.z * m[2][2] + v.w * m[3][2],
                 v.x * m[0][3] + v.y * m[1][3] + v.z * m[2][3] + v.w * m[3][3]);
}

color4 __operator__mul__(matrix m, color4 c)
{
  vector4 r = m * vector4(c.rgb[0], c.rgb[1], c.rgb[2], c.a);
  return color4(color(r.x, r.y, r.z), r.w);
}

color4 __operator__mul__(color4 c, matrix m)
{
  vector4 r = vector4(c.rgb[0], c.rgb[1], c.rgb[2], c.a) * m;
  return color4(color(r.x, r.y, r.z), r.w);
}

color4 __operator__mul__(color4 c, vector4 v)
{
  return color4(c.rgb * color(v.x, v.y, v.z), c.a * v.w);
}

color4 __operator__add__(color4 c, vector4 v)
{
  return color4(c.rgb + color(v.x, v.y, v.z), c.a + v.w);
}

color4 __operator__sub__(color4 c, vector4 v)
{
  return color4(c.rgb - color(v.x, v.y, v.z), c.a - v.w);
}

vector4 pow(vector4 v, vector4 e)
{
  return vector4(pow(v.x, e.x), pow(v.y, e.y), pow(v.z, e.z), pow(v.w, e.w));
}

color4 pow(color4 c, vector4 e)
{
  return color4(color(pow(c.rgb[0], e.x), pow(c.rgb[1], e.y), pow(c.rgb[2], e.z)), pow(c.a, e.w));
}

color4 max(color4 c, vector4 v)
{
  return color4(color(max(c.rgb[0], v.x), max(c.rgb[1], v.y), max(c.rgb[2], v.z)), max(c.a, v.w));
}

color4 min(color4 c, vector4 v)
{
  return color4(color(min(c.rgb[0], v.x), min(c.rgb[1], v.y), min(c.rgb[2], v.z)), min(c.a, v.w));
}
"#;

fn wrap_osl(desc: &ShaderDesc, parts: &ShaderParts<'_>) -> ShaderResult<String> {
    validate_class_name(desc)?;

    let mut text = String::from(OSL_HEADER);
    text.push_str(&plain_text(parts));

    let mut st = ShaderText::new(ShaderLanguage::Osl1);
    st.line("");
    st.line("/* The OSL shader */");
    st.line("");
    st.line(format!("shader {}(", desc.class_name));
    st.indent();
    st.line("color4 inColor = {color(0), 1},");
    st.line("output color4 outColor = {color(0), 1})");
    st.dedent();
    st.line("{");
    st.indent();
    st.new_line().push("outColor = ").push(&desc.function_name).push("(inColor);");
    st.dedent();
    st.line("}");
    text.push_str(st.string());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUNCTION: &str = "\nfloat4 OCIODisplay(float4 inPixel)\n{\n  float4 outColor = inPixel;\n  return outColor;\n}\n";

    fn parts<'a>(declare: &'a str, helper: &'a str) -> ShaderParts<'a> {
        ShaderParts { declare_code: declare, helper_code: helper, function_code: FUNCTION }
    }

    #[test]
    fn test_pass_through_languages() {
        for lang in [ShaderLanguage::Glsl40, ShaderLanguage::HlslDx11, ShaderLanguage::Cg] {
            let text = wrap_shader(&ShaderDesc::new(lang), &parts("", "")).unwrap();
            assert_eq!(text, FUNCTION);
        }
    }

    #[test]
    fn test_msl_params_parsed() {
        let declare = "texture2d<float> ocio_lut1d_0;\nsampler ocio_lut1d_0Sampler;\n\
                       float ocio_knots[12];\nbool ocio_bypass;\n";
        let params = parse_msl_params(declare);
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].ty, "texture2d<float>");
        assert_eq!(params[0].name, "ocio_lut1d_0");
        assert_eq!(params[2].array_len.as_deref(), Some("12"));
        assert_eq!(params[2].params(), vec!["constant float* ocio_knots", "int ocio_knots_count"]);
    }

    #[test]
    fn test_msl_struct() {
        let declare = "texture3d<float> ocio_lut3d_0;\nsampler ocio_lut3d_0Sampler;\nfloat ocio_coefs[6];\n";
        let desc = ShaderDesc::new(ShaderLanguage::Msl20);
        let text = wrap_shader(&desc, &parts(declare, "")).unwrap();
        assert!(text.contains("struct OCIOColorTransform\n{"));
        assert!(text.contains(
            "{\n  OCIOColorTransform(texture3d<float> ocio_lut3d_0, sampler ocio_lut3d_0Sampler, \
             constant float* ocio_coefs, int ocio_coefs_count)"
        ));
        assert!(text.contains("\n  {\n    this->ocio_lut3d_0 = ocio_lut3d_0;"));
        assert!(text.contains("\n    for(int i = 0; i < ocio_coefs_count; ++i)"));
        assert!(text.contains("\n      this->ocio_coefs[i] = ocio_coefs[i];"));
        assert!(text.contains("ocio_coefs[i];\n    }\n  }\n"));
        assert!(text.contains(
            "return OCIOColorTransform(ocio_lut3d_0, ocio_lut3d_0Sampler, ocio_coefs, \
             ocio_coefs_count).OCIODisplay(inPixel);"
        ));
    }

    #[test]
    fn test_msl_rejects_bad_class_names() {
        for name in ["", "3DLut", "my-class"] {
            let desc = ShaderDesc::new(ShaderLanguage::Msl20).with_class_name(name);
            let err = wrap_shader(&desc, &parts("", "")).unwrap_err();
            assert!(matches!(err, ShaderError::UnsupportedLanguage { .. }), "{name}");
        }
    }

    #[test]
    fn test_osl_shader_block() {
        let desc = ShaderDesc::new(ShaderLanguage::Osl1).with_class_name("Grade");
        let text = wrap_shader(&desc, &parts("", "")).unwrap();
        assert!(text.contains("#include \"vector4.h\""));
        assert!(text.contains("#include \"color4.h\""));
        assert!(text.contains("color4 __operator__mul__(matrix m, color4 c)"));
        assert!(text.contains("shader Grade(\n  color4 inColor = {color(0), 1},"));
        assert!(text.contains("  outColor = OCIODisplay(inColor);"));
    }
}
