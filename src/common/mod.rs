pub mod kf1d;
