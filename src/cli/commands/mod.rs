pub mod gate;
pub mod serve;
