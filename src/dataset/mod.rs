//! Dataset module for CIFAR-10 data handling
//!
//! - `cifar10`: download, unpack and parse the binary distribution
//! - `burn_dataset`: Burn `Dataset` and `Batcher` implementations

pub mod burn_dataset;
pub mod cifar10;

pub use burn_dataset::{Cifar10Batch, Cifar10Batcher, Cifar10Dataset, Normalizer};
pub use cifar10::{Cifar10Item, Split};

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// CIFAR-10 class names, indexed by label
pub const CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}
