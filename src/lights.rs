//! Point lights and per-frame light selection.

use cgmath::{InnerSpace, Vector3, Zero};

/// A point light. Strength falls off with the squared distance in the standard shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
    pub strength: f32,
}

impl Light {
    pub fn new(position: Vector3<f32>, color: Vector3<f32>, strength: f32) -> Self {
        Self {
            position,
            color,
            strength: strength.max(0.0),
        }
    }

    /// Padding entry for unused light slots. Contributes no illumination.
    pub fn null() -> Self {
        Self {
            position: Vector3::zero(),
            color: Vector3::zero(),
            strength: 0.0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.strength == 0.0
    }
}

/// Picks the `max` lights closest to `camera`, closest first, padded with
/// [`Light::null`] so the result always has exactly `max` entries.
///
/// Equidistant lights keep their input order. The first entry is the
/// dominant (shadow casting) light.
pub fn select(lights: &[Light], camera: Vector3<f32>, max: usize) -> Vec<Light> {
    let mut sorted: Vec<(f32, &Light)> = lights
        .iter()
        .map(|light| ((light.position - camera).magnitude2(), light))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut selected: Vec<Light> = sorted
        .into_iter()
        .take(max)
        .map(|(_, light)| *light)
        .collect();
    selected.resize(max, Light::null());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_at(x: f32, y: f32, z: f32, strength: f32) -> Light {
        Light::new(Vector3::new(x, y, z), Vector3::new(1.0, 1.0, 1.0), strength)
    }

    #[test]
    fn single_light_is_padded_with_null_lights() {
        let lights = [light_at(5.0, 5.0, 5.0, 8.0)];
        let selected = select(&lights, Vector3::zero(), 3);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0], lights[0]);
        for padding in &selected[1..] {
            assert_eq!(padding.strength, 0.0);
            assert_eq!(padding.position, Vector3::zero());
            assert!(padding.is_null());
        }
    }

    #[test]
    fn closest_lights_come_first() {
        let lights = [
            light_at(10.0, 0.0, 0.0, 1.0),
            light_at(1.0, 0.0, 0.0, 2.0),
            light_at(0.0, -4.0, 0.0, 3.0),
            light_at(0.0, 0.0, 2.0, 4.0),
        ];
        let camera = Vector3::zero();
        let selected = select(&lights, camera, 3);
        let strengths: Vec<f32> = selected.iter().map(|l| l.strength).collect();
        assert_eq!(strengths, vec![2.0, 4.0, 3.0]);
        let distances: Vec<f32> = selected
            .iter()
            .map(|l| (l.position - camera).magnitude())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn ties_keep_input_order() {
        let lights = [
            light_at(0.0, 2.0, 0.0, 1.0),
            light_at(2.0, 0.0, 0.0, 2.0),
            light_at(0.0, 0.0, -2.0, 3.0),
        ];
        let selected = select(&lights, Vector3::zero(), 3);
        let strengths: Vec<f32> = selected.iter().map(|l| l.strength).collect();
        assert_eq!(strengths, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn output_length_always_matches_max() {
        let lights: Vec<Light> = (0..12)
            .map(|i| light_at(i as f32, 0.0, 0.0, 1.0 + i as f32))
            .collect();
        for max in [0, 1, 5, 12, 20] {
            let selected = select(&lights, Vector3::new(3.2, 0.0, 0.0), max);
            assert_eq!(selected.len(), max);
            let real = lights.len().min(max);
            assert!(selected[real..].iter().all(Light::is_null));
            assert!(selected[..real].iter().all(|l| !l.is_null()));
        }
    }

    #[test]
    fn no_lights_yields_only_padding() {
        let selected = select(&[], Vector3::new(1.0, 2.0, 3.0), 4);
        assert_eq!(selected, vec![Light::null(); 4]);
    }

    #[test]
    fn negative_strength_is_clamped() {
        assert_eq!(light_at(0.0, 0.0, 0.0, -2.0).strength, 0.0);
    }
}
