// Domain layer: records, tables, transformation configs and the ports the core talks through.

pub mod model;
pub mod ports;
pub mod transformation;
