//! Program construction for the update and render passes.
//!
//! Shader source comes from the host (it owns the asset pipeline); what
//! lives here is the contract around it: the transform-feedback varyings
//! and the attribute slot bindings have to be declared before link, and a
//! compile or link failure is a construction error, never a null program
//! that faults later.
use glow::HasContext;
use std::{error::Error, fmt};

use crate::particles::{
    INITIAL_VELOCITY_INDEX, MAX_POINT_SIZE, MIN_POINT_SIZE, PARTICLE_LIFETIME, POSITION_INDEX,
    START_TIME_INDEX, VELOCITY_INDEX,
};

/// GPU-side construction failure (shader compile, link, allocation).
#[derive(Debug)]
pub struct ParticleError {
    pub message: String,
}

impl ParticleError {
    pub fn new(message: impl Into<String>) -> ParticleError {
        ParticleError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParticleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "particle engine error: {}", self.message)
    }
}

impl Error for ParticleError {}

/// names the update shader writes its results to, captured per attribute
/// buffer (separate, not interleaved)
const FEEDBACK_VARYINGS: [&str; 3] = ["Position", "Velocity", "StartTime"];

unsafe fn compile_stage(
    gl: &glow::Context,
    kind: u32,
    source: &str,
) -> Result<glow::NativeShader, ParticleError> {
    let shader = gl.create_shader(kind).map_err(ParticleError::new)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(ParticleError::new(format!("shader compile error:\n{}", log)));
    }
    Ok(shader)
}

/// Build the vertex-only update program.  No fragment stage: the update
/// pass never rasterizes, it only captures varyings.
pub fn build_update_program(
    gl: &glow::Context,
    vert_src: &str,
) -> Result<glow::NativeProgram, ParticleError> {
    unsafe {
        let vs = compile_stage(gl, glow::VERTEX_SHADER, vert_src)?;
        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(ParticleError::new(e));
            }
        };
        gl.attach_shader(program, vs);
        // capture setup and attribute slots must be in place before link
        gl.transform_feedback_varyings(program, &FEEDBACK_VARYINGS, glow::SEPARATE_ATTRIBS);
        gl.bind_attrib_location(program, POSITION_INDEX, "VertexPosition");
        gl.bind_attrib_location(program, VELOCITY_INDEX, "VertexVelocity");
        gl.bind_attrib_location(program, START_TIME_INDEX, "VertexStartTime");
        gl.bind_attrib_location(program, INITIAL_VELOCITY_INDEX, "VertexInitialVelocity");
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.detach_shader(program, vs);
            gl.delete_shader(vs);
            gl.delete_program(program);
            return Err(ParticleError::new(format!("update program link error:\n{}", log)));
        }
        gl.detach_shader(program, vs);
        gl.delete_shader(vs);
        Ok(program)
    }
}

/// Build the render program.  Same attribute slots as the update program
/// so both read the same vertex arrays.
pub fn build_render_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
) -> Result<glow::NativeProgram, ParticleError> {
    unsafe {
        let vs = compile_stage(gl, glow::VERTEX_SHADER, vert_src)?;
        let fs = match compile_stage(gl, glow::FRAGMENT_SHADER, frag_src) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };
        let program = match gl.create_program() {
            Ok(p) => p,
            Err(e) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(ParticleError::new(e));
            }
        };
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.bind_attrib_location(program, POSITION_INDEX, "VertexPosition");
        gl.bind_attrib_location(program, START_TIME_INDEX, "VertexStartTime");
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.detach_shader(program, vs);
            gl.detach_shader(program, fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            gl.delete_program(program);
            return Err(ParticleError::new(format!("render program link error:\n{}", log)));
        }
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        set_render_defaults(gl, program);
        Ok(program)
    }
}

/// Default render uniforms: particle texture on unit 0, point size range,
/// and the same lifetime the update program fades against.
fn set_render_defaults(gl: &glow::Context, program: glow::NativeProgram) {
    set_uniform_i32(gl, program, "ParticleTex", 0);
    set_uniform_f32(gl, program, "MinParticleSize", MIN_POINT_SIZE);
    set_uniform_f32(gl, program, "MaxParticleSize", MAX_POINT_SIZE);
    set_uniform_f32(gl, program, "ParticleLifetime", PARTICLE_LIFETIME);
}

/// Set a float uniform if the program still has it (drivers prune unused
/// uniforms, which is not an error here).
pub fn set_uniform_f32(gl: &glow::Context, program: glow::NativeProgram, name: &str, value: f32) {
    unsafe {
        gl.use_program(Some(program));
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_1_f32(Some(&loc), value);
        }
        gl.use_program(None);
    }
}

pub fn set_uniform_vec3(
    gl: &glow::Context,
    program: glow::NativeProgram,
    name: &str,
    value: [f32; 3],
) {
    unsafe {
        gl.use_program(Some(program));
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_3_f32(Some(&loc), value[0], value[1], value[2]);
        }
        gl.use_program(None);
    }
}

pub fn set_uniform_i32(gl: &glow::Context, program: glow::NativeProgram, name: &str, value: i32) {
    unsafe {
        gl.use_program(Some(program));
        if let Some(loc) = gl.get_uniform_location(program, name) {
            gl.uniform_1_i32(Some(&loc), value);
        }
        gl.use_program(None);
    }
}

#[cfg(test)]
mod test_shaders {
    use super::*;

    #[test]
    fn error_carries_the_log() {
        let err = ParticleError::new("shader compile error:\n0:1: oops");
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn varyings_line_up_with_capture_slots() {
        // slot k of the feedback object catches varying k
        assert_eq!(FEEDBACK_VARYINGS[POSITION_INDEX as usize], "Position");
        assert_eq!(FEEDBACK_VARYINGS[VELOCITY_INDEX as usize], "Velocity");
        assert_eq!(FEEDBACK_VARYINGS[START_TIME_INDEX as usize], "StartTime");
    }
}
