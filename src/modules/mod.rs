//! Song generation pipeline.
//!
//! `request` builds and validates jobs, `submit` creates them, `status`
//! polls them, `download` saves the results and `task` runs the whole
//! lifecycle for one request.

pub mod download;
pub mod request;
pub mod status;
pub mod submit;
pub mod task;
