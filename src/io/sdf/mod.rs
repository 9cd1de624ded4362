//! MDL SDF (CTfile V2000) input.

pub mod reader;
