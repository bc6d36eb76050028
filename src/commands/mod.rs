pub mod serve;
pub mod stylesheet;
pub mod upload;
