pub mod main_stats;
pub mod videocard;
