// ============================================================================
// rehash-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the ffmpeg Executable
//
// This module encapsulates everything that touches the external encoder:
// building command lines and spawning/waiting on the process. Spawning sits
// behind the `FfmpegSpawner` trait so the worker and scheduler can be driven
// by a mock in tests.
//
// KEY COMPONENTS:
// - FfmpegCommandBuilder: common flags for every invocation
// - FfmpegSpawner / FfmpegProcess: spawning and waiting abstraction
// - SidecarSpawner: the real implementation on top of ffmpeg-sidecar
// - MockFfmpegSpawner: scripted stand-in (tests and the `test-mocks` feature)

// ============================================================================
// SUBMODULES
// ============================================================================

/// Command construction for ffmpeg invocations
pub mod ffmpeg_builder;

/// Traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Scripted spawner used by tests
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_builder::{
    FfmpegCommandBuilder, build_transform_command, command_args, command_os_args,
};
pub use ffmpeg_executor::{
    ExitReport, FfmpegProcess, FfmpegSpawner, ProcessExit, ProcessRegistry, SidecarProcess,
    SidecarSpawner,
};
