//! Tomato-cultivation advice derived from the predicted soil type and the
//! optional pH estimate. Pure lookups, no I/O.

use std::collections::HashMap;

use lazy_static::lazy_static;
use shared::SoilQuality;

/// pH band tomatoes prefer; estimates outside it earn a caveat.
pub const PH_TARGET_RANGE: (f32, f32) = (6.0, 6.8);

lazy_static! {
    static ref SOIL_ADVICE: HashMap<&'static str, &'static str> = {
        let mut advice = HashMap::new();
        advice.insert(
            "Alluvial soil",
            "Alluvial soil is typically fertile and good for tomatoes. Ensure consistent \
             moisture and balanced nutrients. Good drainage is key.",
        );
        advice.insert(
            "Black Soil",
            "Black soil is rich in clay and organic matter, holding water well. Ensure good \
             aeration to prevent waterlogging. Calcium supplementation can be beneficial for \
             tomato quality.",
        );
        advice.insert(
            "Clay soil",
            "Clay soil can become compacted and has poor drainage. Amend with plenty of organic \
             matter (compost) and consider gypsum to improve structure and drainage. Focus on \
             consistent watering to avoid cracking.",
        );
        advice.insert(
            "Red soil",
            "Red soil can be acidic and often lacks organic matter. Add lime to raise pH if \
             needed (target 6.0-6.8). Incorporate organic compost to improve fertility and \
             water retention. Monitor phosphorus and iron levels.",
        );
        advice
    };
}

const GENERAL_ADVICE: &str =
    "Soil characteristics can vary. General recommendations for tomatoes: Maintain soil pH \
     between 6.0 and 6.8. Provide balanced nutrition, especially nitrogen for leaves and \
     potassium for fruit development. Ensure consistent watering.";

fn ph_in_range(ph: f32) -> bool {
    (PH_TARGET_RANGE.0..=PH_TARGET_RANGE.1).contains(&ph)
}

/// Discrete quality table over {label x pH-in-range}. No interpolation or
/// scoring formula; unknown labels always map to Unknown.
fn quality_for(label: &str, in_range: bool) -> SoilQuality {
    match (label, in_range) {
        ("Alluvial soil", true) => SoilQuality::Excellent,
        ("Alluvial soil", false) => SoilQuality::Good,
        ("Black Soil", true) => SoilQuality::Good,
        ("Black Soil", false) => SoilQuality::Okay,
        ("Clay soil", true) => SoilQuality::Okay,
        ("Clay soil", false) => SoilQuality::Challenging,
        ("Red soil", true) => SoilQuality::Good,
        ("Red soil", false) => SoilQuality::Challenging,
        _ => SoilQuality::Unknown,
    }
}

fn ph_caveat(ph: f32) -> Option<String> {
    if ph < PH_TARGET_RANGE.0 {
        Some(format!(
            " Estimated pH {:.1} is below the {:.1}-{:.1} range tomatoes prefer; work \
             agricultural lime into the topsoil to raise it.",
            ph, PH_TARGET_RANGE.0, PH_TARGET_RANGE.1
        ))
    } else if ph > PH_TARGET_RANGE.1 {
        Some(format!(
            " Estimated pH {:.1} is above the {:.1}-{:.1} range tomatoes prefer; elemental \
             sulfur or acidic organic matter will bring it down over a season.",
            ph, PH_TARGET_RANGE.0, PH_TARGET_RANGE.1
        ))
    } else {
        None
    }
}

/// Advisory text and quality tier for a prediction. The tier is only
/// defined when a pH estimate is available.
pub fn recommend(label: &str, ph: Option<f32>) -> (String, Option<SoilQuality>) {
    let mut text = SOIL_ADVICE
        .get(label)
        .copied()
        .unwrap_or(GENERAL_ADVICE)
        .to_string();

    let quality = ph.map(|ph| {
        if let Some(caveat) = ph_caveat(ph) {
            text.push_str(&caveat);
        }
        quality_for(label, ph_in_range(ph))
    });

    (text, quality)
}
