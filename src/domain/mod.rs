// Domain layer: the canonical job record and the ports adapters implement.

pub mod model;
pub mod ports;
