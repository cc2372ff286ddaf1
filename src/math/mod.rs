pub mod fixed_point;
pub mod swap_step;
pub mod tick;
