//! The soil classification network.
//!
//! Two stacked conv/pool blocks feeding a dense layer, with a class head
//! and, in the dual-head variant, an additional scalar pH head sharing the
//! same trunk. Input is NCHW [N, 3, 224, 224].

use tch::nn;
use tch::nn::ModuleT;
use tch::Tensor;

/// Feature width after conv(3x3)/pool(2) twice over a 224x224 input:
/// 224 -> 222 -> 111 -> 109 -> 54, with 64 output channels.
const FLAT_FEATURES: i64 = 64 * 54 * 54;
const DENSE_FEATURES: i64 = 128;

/// Which trained architecture an artifact holds. A weights file does not
/// self-describe, so the variant is part of the configuration contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Soil-class logits only.
    Classifier,
    /// Soil-class logits plus a scalar pH estimate.
    DualHead,
}

impl ModelVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classifier" | "single" => Some(ModelVariant::Classifier),
            "dual" | "dual-head" | "dualhead" => Some(ModelVariant::DualHead),
            _ => None,
        }
    }

    pub fn has_ph_head(self) -> bool {
        matches!(self, ModelVariant::DualHead)
    }
}

#[derive(Debug)]
pub struct SoilNet {
    trunk: nn::SequentialT,
    class_head: nn::Linear,
    ph_head: Option<nn::Linear>,
}

impl SoilNet {
    pub fn new(vs: &nn::Path, variant: ModelVariant, num_classes: i64) -> Self {
        let trunk = nn::seq_t()
            .add(nn::conv2d(vs / "conv1", 3, 32, 3, Default::default()))
            .add_fn(|xs| xs.relu().max_pool2d_default(2))
            .add(nn::conv2d(vs / "conv2", 32, 64, 3, Default::default()))
            .add_fn(|xs| xs.relu().max_pool2d_default(2))
            .add_fn(|xs| xs.flat_view())
            .add(nn::linear(
                vs / "fc1",
                FLAT_FEATURES,
                DENSE_FEATURES,
                Default::default(),
            ))
            .add_fn(|xs| xs.relu());

        let class_head = nn::linear(
            vs / "class_head",
            DENSE_FEATURES,
            num_classes,
            Default::default(),
        );
        let ph_head = variant.has_ph_head().then(|| {
            nn::linear(vs / "ph_head", DENSE_FEATURES, 1, Default::default())
        });

        Self {
            trunk,
            class_head,
            ph_head,
        }
    }

    /// Run the trunk once and both heads off the shared features. Returns
    /// raw class logits and, when present, the raw (unclamped) pH batch.
    pub fn forward(&self, xs: &Tensor, train: bool) -> (Tensor, Option<Tensor>) {
        let features = self.trunk.forward_t(xs, train);
        let logits = features.apply(&self.class_head);
        let ph = self
            .ph_head
            .as_ref()
            .map(|head| features.apply(head).squeeze_dim(-1));
        (logits, ph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parsing_accepts_common_spellings() {
        assert_eq!(ModelVariant::parse("classifier"), Some(ModelVariant::Classifier));
        assert_eq!(ModelVariant::parse("Dual"), Some(ModelVariant::DualHead));
        assert_eq!(ModelVariant::parse("dual-head"), Some(ModelVariant::DualHead));
        assert_eq!(ModelVariant::parse("resnet"), None);
    }

    #[test]
    fn forward_shapes_for_both_variants() {
        let vs = nn::VarStore::new(tch::Device::Cpu);
        let input = Tensor::zeros([2, 3, 224, 224], (tch::Kind::Float, tch::Device::Cpu));

        let net = SoilNet::new(&vs.root(), ModelVariant::Classifier, 4);
        let (logits, ph) = net.forward(&input, false);
        assert_eq!(logits.size(), vec![2, 4]);
        assert!(ph.is_none());

        let vs = nn::VarStore::new(tch::Device::Cpu);
        let net = SoilNet::new(&vs.root(), ModelVariant::DualHead, 4);
        let (logits, ph) = net.forward(&input, false);
        assert_eq!(logits.size(), vec![2, 4]);
        assert_eq!(ph.unwrap().size(), vec![2]);
    }
}
