// Composition root for the teams bounded context.
//
// Responsibilities
// - Read settings from the environment.
// - Instantiate concrete infrastructure and wire it into the command handler,
//   the projector and the query port.
// - Spawn and stop background workers (the live projector).

pub mod config;
pub mod state;
pub mod workers;
