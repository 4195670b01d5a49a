pub mod intent;
pub mod params;
pub mod state;
pub mod tool;
