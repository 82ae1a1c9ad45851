pub mod id_generator;
pub mod system;
pub mod watch;
