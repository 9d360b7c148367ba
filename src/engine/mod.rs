pub mod rombuffer;
pub mod compression;
