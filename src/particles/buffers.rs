//! GPU buffer sets for the ping-pong update pass.
//!
//! Each set owns position/velocity/start-time buffers plus one vertex
//! array and one transform-feedback object.  The initial-velocity buffer
//! is shared: it is read-only reference data the update shader uses to
//! relaunch expired particles, so both vertex arrays point at the same
//! buffer and no feedback slot ever writes it.
use glow::HasContext;

use crate::particles::seed::SeedData;
use crate::particles::shaders::ParticleError;
use crate::particles::{
    INITIAL_VELOCITY_INDEX, POSITION_INDEX, START_TIME_INDEX, VELOCITY_INDEX,
};

pub struct ParticleBufferSet {
    pub positions: glow::NativeBuffer,
    pub velocities: glow::NativeBuffer,
    pub start_times: glow::NativeBuffer,
    pub vao: glow::NativeVertexArray,
    pub feedback: glow::NativeTransformFeedback,
}

/// Allocate an ARRAY_BUFFER, seeded when data is given, otherwise sized
/// but undefined (the ping-pong target gets overwritten before first use).
pub fn alloc_buffer(
    gl: &glow::Context,
    data: Option<&[f32]>,
    len_floats: usize,
    usage: u32,
) -> Result<glow::NativeBuffer, ParticleError> {
    unsafe {
        let buffer = gl.create_buffer().map_err(ParticleError::new)?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        match data {
            Some(floats) => {
                let bytes = std::slice::from_raw_parts(
                    floats.as_ptr() as *const u8,
                    floats.len() * std::mem::size_of::<f32>(),
                );
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, usage);
            }
            None => {
                let size = (len_floats * std::mem::size_of::<f32>()) as i32;
                gl.buffer_data_size(glow::ARRAY_BUFFER, size, usage);
            }
        }
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        Ok(buffer)
    }
}

impl ParticleBufferSet {
    /// Build one buffer set for `count` particles.  `seeds` fills the
    /// buffers for the starting set; None leaves them undefined for the
    /// ping-pong target.  `init_velocity` is the shared reference buffer.
    pub fn build(
        gl: &glow::Context,
        count: usize,
        seeds: Option<&SeedData>,
        init_velocity: glow::NativeBuffer,
    ) -> Result<ParticleBufferSet, ParticleError> {
        let positions = alloc_buffer(
            gl,
            seeds.map(|s| s.positions.as_slice()),
            count * 3,
            glow::STATIC_DRAW,
        )?;
        let velocities = alloc_buffer(
            gl,
            seeds.map(|s| s.velocities.as_slice()),
            count * 3,
            glow::STATIC_DRAW,
        )?;
        let start_times = alloc_buffer(
            gl,
            seeds.map(|s| s.start_times.as_slice()),
            count,
            glow::DYNAMIC_COPY,
        )?;

        unsafe {
            let vao = gl.create_vertex_array().map_err(ParticleError::new)?;
            gl.bind_vertex_array(Some(vao));

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(positions));
            gl.vertex_attrib_pointer_f32(POSITION_INDEX, 3, glow::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(POSITION_INDEX);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(velocities));
            gl.vertex_attrib_pointer_f32(VELOCITY_INDEX, 3, glow::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(VELOCITY_INDEX);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(start_times));
            gl.vertex_attrib_pointer_f32(START_TIME_INDEX, 1, glow::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(START_TIME_INDEX);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(init_velocity));
            gl.vertex_attrib_pointer_f32(INITIAL_VELOCITY_INDEX, 3, glow::FLOAT, false, 0, 0);
            gl.enable_vertex_attrib_array(INITIAL_VELOCITY_INDEX);

            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);

            // the capture side: slot k of the feedback object catches the
            // update program's varying k into this set's own buffers
            let feedback = gl.create_transform_feedback().map_err(ParticleError::new)?;
            gl.bind_transform_feedback(glow::TRANSFORM_FEEDBACK, Some(feedback));
            gl.bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, POSITION_INDEX, Some(positions));
            gl.bind_buffer_base(glow::TRANSFORM_FEEDBACK_BUFFER, VELOCITY_INDEX, Some(velocities));
            gl.bind_buffer_base(
                glow::TRANSFORM_FEEDBACK_BUFFER,
                START_TIME_INDEX,
                Some(start_times),
            );
            gl.bind_transform_feedback(glow::TRANSFORM_FEEDBACK, None);

            Ok(ParticleBufferSet {
                positions,
                velocities,
                start_times,
                vao,
                feedback,
            })
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_transform_feedback(self.feedback);
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.positions);
            gl.delete_buffer(self.velocities);
            gl.delete_buffer(self.start_times);
        }
    }
}
