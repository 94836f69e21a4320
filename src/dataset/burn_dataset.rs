//! Burn Dataset Integration for CIFAR-10
//!
//! Implements Burn's `Dataset` trait over parsed records and a `Batcher` that
//! turns items into normalized image tensors.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;

use super::cifar10::{self, Cifar10Item, Split};
use super::{IMAGENET_MEAN, IMAGENET_STD};
use crate::utils::error::Result;
use crate::{IMAGE_SIZE, NUM_CLASSES};

/// One split of CIFAR-10 held in memory
#[derive(Debug, Clone)]
pub struct Cifar10Dataset {
    items: Vec<Cifar10Item>,
    split: Split,
}

impl Cifar10Dataset {
    /// Load a split from `data_dir`, downloading the archive on first use
    pub fn new(data_dir: impl AsRef<Path>, split: Split) -> Result<Self> {
        let batches_dir = cifar10::ensure_downloaded(data_dir.as_ref())?;
        let items = cifar10::load_split(&batches_dir, split)?;
        tracing::info!("Loaded {} {} samples", items.len(), split);
        Ok(Self { items, split })
    }

    /// The 50,000-image training split
    pub fn train(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(data_dir, Split::Train)
    }

    /// The 10,000-image test split
    pub fn test(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(data_dir, Split::Test)
    }

    /// Wrap already-parsed items
    pub fn from_items(split: Split, items: Vec<Cifar10Item>) -> Self {
        Self { items, split }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    /// Ground-truth labels in dataset order
    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }

    /// Number of samples per class
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for item in &self.items {
            if item.label < NUM_CLASSES {
                counts[item.label] += 1;
            }
        }
        counts
    }
}

impl Dataset<Cifar10Item> for Cifar10Dataset {
    fn get(&self, index: usize) -> Option<Cifar10Item> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Per-channel normalization applied to `[0, 1]` images
#[derive(Clone, Debug)]
pub struct Normalizer<B: Backend> {
    mean: Tensor<B, 4>,
    std: Tensor<B, 4>,
}

impl<B: Backend> Normalizer<B> {
    pub fn new(mean: [f32; 3], std: [f32; 3], device: &B::Device) -> Self {
        let mean = Tensor::<B, 1>::from_floats(mean, device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(std, device).reshape([1, 3, 1, 1]);
        Self { mean, std }
    }

    /// ImageNet channel statistics
    pub fn imagenet(device: &B::Device) -> Self {
        Self::new(IMAGENET_MEAN, IMAGENET_STD, device)
    }

    /// `(input - mean) / std`, broadcast over batch and spatial dims
    pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        (input - self.mean.clone()) / self.std.clone()
    }
}

/// A batch of images and their labels
#[derive(Clone, Debug)]
pub struct Cifar10Batch<B: Backend> {
    /// Shape `[batch_size, 3, 32, 32]`
    pub images: Tensor<B, 4>,
    /// Shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher producing normalized CIFAR-10 batches on a device
#[derive(Clone, Debug)]
pub struct Cifar10Batcher<B: Backend> {
    device: B::Device,
    normalizer: Normalizer<B>,
}

impl<B: Backend> Cifar10Batcher<B> {
    pub fn new(device: B::Device) -> Self {
        let normalizer = Normalizer::imagenet(&device);
        Self { device, normalizer }
    }
}

impl<B: Backend> Batcher<Cifar10Item, Cifar10Batch<B>> for Cifar10Batcher<B> {
    fn batch(&self, items: Vec<Cifar10Item>) -> Cifar10Batch<B> {
        let batch_size = items.len();

        // Pixel bytes to [0, 1]; records are already CHW
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().map(|&p| p as f32 / 255.0))
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, IMAGE_SIZE, IMAGE_SIZE])
                .convert::<B::FloatElem>(),
            &self.device,
        );
        let images = self.normalizer.normalize(images);

        let labels: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            &self.device,
        );

        Cifar10Batch { images, targets }
    }
}
