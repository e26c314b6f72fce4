pub use moving_average::MovingAverage;

pub mod moving_average;
