//! The Brain's interface to the Gut's emotional state. One-way flow: Gut →
//! Brain. Nothing in here may construct or mutate a `GutState` — it only
//! reads the snapshot it's handed.

use traceos_types::{GutState, MoodState};

/// Adjust a base creativity temperature by the current mood. Frustration
/// throttles, flow emboldens, Chaos backs off hard, Exploration nudges up.
/// Clamped to 0.1–2.0.
pub fn adjust_creativity(base_temperature: f64, gut: Option<&GutState>) -> f64 {
    let gut = match gut {
        Some(g) => g,
        None => return base_temperature,
    };

    let mut temp = base_temperature;

    if gut.frustration_index > 0.7 {
        temp *= 0.5;
    }

    if gut.flow_probability > 0.8 {
        temp *= 1.3;
    }

    if gut.mood == MoodState::Chaos {
        temp *= 0.3;
    }

    if gut.mood == MoodState::Exploration && gut.frustration_index < 0.4 {
        temp *= 1.15;
    }

    temp.clamp(0.1, 2.0)
}

/// Adjust the maximum allowed style distance by the current mood. Flow
/// widens tolerance, frustration narrows it back toward established style.
/// Clamped to 0.1–0.5.
pub fn adjust_style_distance(base_max_distance: f64, gut: Option<&GutState>) -> f64 {
    let gut = match gut {
        Some(g) => g,
        None => return base_max_distance,
    };

    let mut distance = base_max_distance;

    if gut.flow_probability > 0.8 {
        distance *= 1.3;
    }

    if gut.frustration_index > 0.7 {
        distance *= 0.7;
    }

    if gut.mood == MoodState::Exploration {
        distance *= 1.2;
    }

    distance.clamp(0.1, 0.5)
}

/// Whether the current emotional state warrants routing to the Shadow organ
/// for alternative processing — Chaos, or sustained extreme frustration.
pub fn should_route_to_shadow(gut: Option<&GutState>) -> bool {
    let gut = match gut {
        Some(g) => g,
        None => return false,
    };

    gut.mood == MoodState::Chaos || gut.frustration_index > 0.9
}
