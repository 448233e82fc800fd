pub mod dense;

pub use dense::{DenseLayer, LayerGradients, LayerTrace};
