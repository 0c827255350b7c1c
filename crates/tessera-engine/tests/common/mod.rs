#![allow(dead_code)]

use tessera_engine::device::{GpuContext, SharedContext, SoftDevice};
use tessera_engine::shader::{Shader, ShaderSource};

pub const FLAT_SHADER: &str = r#"
#shader vertex
struct Uniforms {
    u_MVP: mat4x4<f32>,
    u_Color: vec4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return u.u_MVP * vec4<f32>(position, 0.0, 1.0);
}

#shader fragment
struct Uniforms {
    u_MVP: mat4x4<f32>,
    u_Color: vec4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u.u_Color;
}
"#;

pub const TEXTURED_SHADER: &str = r#"
#shader vertex
struct Uniforms {
    u_MVP: mat4x4<f32>,
    u_Textures: array<vec4<i32>, 2>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) @interpolate(flat) slot: i32,
}

@vertex
fn vs_main(
    @location(0) position: vec2<f32>,
    @location(2) texcoord: vec2<f32>,
    @location(3) tex_index: f32,
) -> VsOut {
    var out: VsOut;
    out.clip = u.u_MVP * vec4<f32>(position, 0.0, 1.0);
    out.uv = texcoord;
    out.slot = i32(tex_index);
    return out;
}

#shader fragment
@group(0) @binding(1) var s: sampler;
@group(0) @binding(2) var t0: texture_2d<f32>;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(t0, s, uv);
}
"#;

pub fn soft() -> SharedContext<SoftDevice> {
    GpuContext::shared(SoftDevice::new())
}

pub fn shader(ctx: &SharedContext<SoftDevice>, text: &str) -> Shader<SoftDevice> {
    Shader::new(ctx, &ShaderSource::parse(text))
}
