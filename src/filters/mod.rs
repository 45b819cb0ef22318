pub mod kalman;

pub use kalman::KalmanFilter3;
