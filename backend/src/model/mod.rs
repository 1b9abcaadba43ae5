mod network;

pub use network::{ModelVariant, SoilNet};

use std::path::{Path, PathBuf};

use tch::{nn, Device, Kind, Tensor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model weights from {path:?}: {source}")]
    Load {
        path: PathBuf,
        source: tch::TchError,
    },
    #[error("model inference error: {0}")]
    Inference(tch::TchError),
}

/// Raw output of one forward pass, before any label mapping.
#[derive(Debug, Clone)]
pub struct RawPrediction {
    /// Softmax probabilities in class-list order.
    pub probabilities: Vec<f32>,
    /// Unclamped pH estimate, dual-head variant only.
    pub ph: Option<f32>,
}

/// A loaded, frozen model. Load-once at startup, never reloaded; replaced
/// only by restarting the process against a new artifact.
#[derive(Debug)]
pub struct SoilModel {
    vs: nn::VarStore,
    net: SoilNet,
    variant: ModelVariant,
}

impl SoilModel {
    /// Construct the network and load trained weights into it. Fails when
    /// the artifact is missing, or when its shapes disagree with the
    /// configured variant or the class-list length; a width mismatch would
    /// otherwise silently mislabel every prediction.
    pub fn load(
        path: &Path,
        variant: ModelVariant,
        num_classes: usize,
    ) -> Result<Self, ModelError> {
        let device = Device::cuda_if_available();
        let mut vs = nn::VarStore::new(device);
        let net = SoilNet::new(&vs.root(), variant, num_classes as i64);

        vs.load(path).map_err(|source| ModelError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        vs.freeze();

        Ok(Self { vs, net, variant })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    /// Forward pass over one preprocessed [1, 3, 224, 224] tensor.
    pub fn predict(&self, input: &Tensor) -> Result<RawPrediction, ModelError> {
        let input = input.to_device(self.vs.device());

        let (probs, ph) = tch::no_grad(|| {
            let (logits, ph) = self.net.forward(&input, false);
            (logits.softmax(-1, Kind::Float).view([-1]), ph)
        });

        let probabilities = Vec::<f32>::try_from(&probs).map_err(ModelError::Inference)?;
        let ph = ph.map(|t| t.double_value(&[0]) as f32);

        Ok(RawPrediction { probabilities, ph })
    }
}
