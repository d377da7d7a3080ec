//! # Workbench: Real-Time RL Simulation
//!
//! The workbench steps a reinforcement-learning environment under an
//! interactive playback clock while keeping running normalization statistics
//! for the agent's inputs and outputs.
//!
//! ## Project Architecture
//!
//! -   **[`stats`]:** grouped running mean/std accumulators, the
//!     [`stats::Normalizer`] that owns them, read-only mirrors consumed by a
//!     computation graph, and JSON persistence.
//! -   **[`sim`]:** the [`sim::World`] interface, the episode scheduler that
//!     splits time into sub-steps and resets finished or invalid episodes,
//!     and the playback controller that paces ticks at a signed speed.
//! -   **`workbench`:** this crate. It holds the run configuration, a
//!     cart-pole world driven by a noisy linear controller, and the binary
//!     that ties everything into a headless or real-time loop.
//!
//! ## Getting Started
//!
//! ```text
//! RUST_LOG=debug cargo run -p workbench -- --headless --max-ticks 600 \
//!     --playback-speed 4 --stats-out stats.json
//! ```
//!
//! A second run with `--stats-in stats.json` resumes the statistics, weighted
//! by the stored sample count.

pub mod cartpole;
pub mod config;

pub use sim;
pub use stats;
