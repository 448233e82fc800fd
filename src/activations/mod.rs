//! # Activation Functions Module
//!
//! The estimator's backbone alternates affine transforms with rectified-linear
//! units and ends in an identity output:
//!
//! - **ReLU**: `max(0, x)`, used after every hidden layer
//! - **Linear**: identity, used after the final layer
//!
//! ```rust
//! use deepq::activations::Activation;
//! use ndarray::array;
//!
//! let mut data = array![[1.0, -0.5, 0.0, 2.0]];
//! Activation::Relu.apply_batch(&mut data);
//! assert_eq!(data, array![[1.0, 0.0, 0.0, 2.0]]);
//! ```

pub mod functions;

pub use functions::Activation;
