//! The per-frame simulation pass.
//!
//! The engine owns the two buffer sets, the update program and the clock.
//! Each tick it flips which half is the source, draws the population as
//! points with rasterization discarded, and lets the feedback object on
//! the opposite half catch the results.  There is no error branch in the
//! tick path; a GPU fault mid-frame has no recovery.
use glow::HasContext;
use log::debug;
use rand::Rng;

use crate::particles::buffers::{alloc_buffer, ParticleBufferSet};
use crate::particles::pingpong::{tick_roles, Half};
use crate::particles::seed::seed_particles;
use crate::particles::shaders::{
    build_update_program, set_uniform_f32, set_uniform_vec3, ParticleError,
};
use crate::particles::{
    MAX_START_SPEED, NOMINAL_FRAME_RATE, PARTICLE_COUNT, PARTICLE_LIFETIME, START_TIME_RATE,
};

/// Frame-counter clock at the nominal rate; one tick per update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    frame: u64,
}

impl SimulationClock {
    pub fn new() -> SimulationClock {
        SimulationClock { frame: 0 }
    }

    pub fn tick(&mut self) -> () {
        self.frame += 1;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// elapsed simulation time, fed to both the update and render shaders
    pub fn elapsed(&self) -> f32 {
        self.frame as f32 / NOMINAL_FRAME_RATE
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        SimulationClock::new()
    }
}

pub struct ParticleEngine {
    sets: [ParticleBufferSet; 2],
    init_velocity: glow::NativeBuffer,
    update_program: glow::NativeProgram,
    time_loc: Option<glow::NativeUniformLocation>,
    source: Half,
    clock: SimulationClock,
}

impl ParticleEngine {
    /// One-time construction: compile the update program, seed the
    /// starting set, allocate the ping-pong target.  Fallible all the way
    /// down; an engine either exists fully or not at all.
    pub fn build<R: Rng>(
        gl: &glow::Context,
        update_vert_src: &str,
        rng: &mut R,
    ) -> Result<ParticleEngine, ParticleError> {
        let update_program = build_update_program(gl, update_vert_src)?;

        // fixed step, no drift field by default, three second lifetime
        set_uniform_f32(gl, update_program, "H", 1.0 / NOMINAL_FRAME_RATE);
        set_uniform_vec3(gl, update_program, "Accel", [0.0, 0.0, 0.0]);
        set_uniform_f32(gl, update_program, "ParticleLifetime", PARTICLE_LIFETIME);
        let time_loc = unsafe { gl.get_uniform_location(update_program, "Time") };

        let seeds = seed_particles(rng, PARTICLE_COUNT, START_TIME_RATE, MAX_START_SPEED);
        let init_velocity = alloc_buffer(
            gl,
            Some(seeds.velocities.as_slice()),
            PARTICLE_COUNT * 3,
            glow::STATIC_DRAW,
        )?;

        let set_a = ParticleBufferSet::build(gl, PARTICLE_COUNT, Some(&seeds), init_velocity)?;
        let set_b = ParticleBufferSet::build(gl, PARTICLE_COUNT, None, init_velocity)?;

        debug!("particle engine up: {} particles", PARTICLE_COUNT);
        Ok(ParticleEngine {
            sets: [set_a, set_b],
            init_velocity,
            update_program,
            time_loc,
            // first tick flips this to A, so the seeded set is read first
            source: Half::B,
            clock: SimulationClock::new(),
        })
    }

    /// Advance the population one tick.  Reads the source half, captures
    /// into the other, swaps the designation.  Called once per frame.
    pub fn update(&mut self, gl: &glow::Context) -> () {
        let roles = tick_roles(self.source);
        self.source = roles.read;
        let read = &self.sets[roles.read.index()];
        let write = &self.sets[roles.write.index()];

        unsafe {
            gl.use_program(Some(self.update_program));
            gl.bind_vertex_array(Some(read.vao));
            // no fragment stage on the update program; keep the
            // rasterizer out of the pipeline entirely
            gl.enable(glow::RASTERIZER_DISCARD);
            if let Some(loc) = &self.time_loc {
                gl.uniform_1_f32(Some(loc), self.clock.elapsed());
            }
            gl.bind_transform_feedback(glow::TRANSFORM_FEEDBACK, Some(write.feedback));
            gl.begin_transform_feedback(glow::POINTS);
            gl.draw_arrays(glow::POINTS, 0, PARTICLE_COUNT as i32);
            gl.end_transform_feedback();
            gl.bind_transform_feedback(glow::TRANSFORM_FEEDBACK, None);
            gl.disable(glow::RASTERIZER_DISCARD);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }

        self.clock.tick();
    }

    /// which half the render pass should read this frame
    pub fn render_half(&self) -> Half {
        self.source.other()
    }

    /// vertex array holding the freshly captured state
    pub fn render_vao(&self) -> glow::NativeVertexArray {
        self.sets[self.render_half().index()].vao
    }

    pub fn particle_count(&self) -> usize {
        PARTICLE_COUNT
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    /// Tear down all GPU resources.  The engine is unusable afterwards.
    pub fn destroy(self, gl: &glow::Context) -> () {
        for set in &self.sets {
            set.destroy(gl);
        }
        unsafe {
            gl.delete_buffer(self.init_velocity);
            gl.delete_program(self.update_program);
        }
    }
}

#[cfg(test)]
mod test_clock {
    use super::*;

    #[test]
    fn elapsed_counts_frames_at_nominal_rate() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.elapsed(), 0.0);
        for _ in 0..60 {
            clock.tick();
        }
        assert!((clock.elapsed() - 1.0).abs() < 1e-6);
        assert_eq!(clock.frame(), 60);
        clock.tick();
        assert!((clock.elapsed() - 61.0 / 60.0).abs() < 1e-6);
    }
}
