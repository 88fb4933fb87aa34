//! Transform-feedback particle engine.
//!
//! A fixed population of particles lives in two GPU-resident buffer sets.
//! Every frame the update program reads one set through its vertex array
//! and captures new position/velocity/start-time into the other set's
//! feedback object, rasterization suppressed; then the roles swap.  The
//! render pass always reads the freshly captured set.
pub mod buffers;
pub mod engine;
pub mod pingpong;
pub mod seed;
pub mod shaders;

/// population size, fixed at construction
pub const PARTICLE_COUNT: usize = 4000;

/// attribute slots, shared by the update and render programs
pub const POSITION_INDEX: u32 = 0;
pub const VELOCITY_INDEX: u32 = 1;
pub const START_TIME_INDEX: u32 = 2;
pub const INITIAL_VELOCITY_INDEX: u32 = 3;

/// nominal frame rate the simulation clock counts against
pub const NOMINAL_FRAME_RATE: f32 = 60.0;
/// seconds a particle lives before the update shader recycles it
pub const PARTICLE_LIFETIME: f32 = 3.0;
/// stagger between consecutive particle birth times
pub const START_TIME_RATE: f32 = 0.001;
/// upper bound for the seeded launch speed
pub const MAX_START_SPEED: f32 = 1.5;
/// point sprite size range for the render pass
pub const MIN_POINT_SIZE: f32 = 1.0;
pub const MAX_POINT_SIZE: f32 = 64.0;
