//! Easing curves for property animations.
//!
//! Curves are addressed by the numeric codes exposed through the `Easing`
//! global (`Easing.Linear` is 1, then In/Out/InOut/OutIn of each family).
//! Unknown codes fall back to linear.

use std::f64::consts::PI;

/// Curve names in code order, starting at code 1.
pub const CURVE_NAMES: [&str; 41] = [
    "Linear",
    "InQuad", "OutQuad", "InOutQuad", "OutInQuad",
    "InCubic", "OutCubic", "InOutCubic", "OutInCubic",
    "InQuart", "OutQuart", "InOutQuart", "OutInQuart",
    "InQuint", "OutQuint", "InOutQuint", "OutInQuint",
    "InSine", "OutSine", "InOutSine", "OutInSine",
    "InExpo", "OutExpo", "InOutExpo", "OutInExpo",
    "InCirc", "OutCirc", "InOutCirc", "OutInCirc",
    "InElastic", "OutElastic", "InOutElastic", "OutInElastic",
    "InBack", "OutBack", "InOutBack", "OutInBack",
    "InBounce", "OutBounce", "InOutBounce", "OutInBounce",
];

pub const LINEAR: u32 = 1;

/// Numeric code of a curve name.
pub fn code_of(name: &str) -> Option<u32> {
    CURVE_NAMES.iter().position(|n| *n == name).map(|i| i as u32 + 1)
}

/// Shape parameters of the `easing` property group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingParams {
    pub amplitude: f64,
    pub overshoot: f64,
    pub period: f64,
}

impl Default for EasingParams {
    fn default() -> Self {
        Self { amplitude: 1.0, overshoot: 1.70158, period: 0.3 }
    }
}

/// Map linear progress `t` in `0..=1` through curve `code`.
pub fn value_for_progress(code: u32, t: f64, p: &EasingParams) -> f64 {
    let EasingParams { amplitude: a, overshoot: s, period } = *p;
    let phase = (1.0 / a).asin();
    let half = t < 0.5;
    match code {
        // Quad
        2 => t.powi(2),
        3 => -(t - 1.0).powi(2) + 1.0,
        4 if half => 2.0 * t.powi(2),
        4 => -2.0 * (t - 1.0).powi(2) + 1.0,
        5 if half => -2.0 * (t - 0.5).powi(2) + 0.5,
        5 => 2.0 * (t - 0.5).powi(2) + 0.5,
        // Cubic
        6 => t.powi(3),
        7 => (t - 1.0).powi(3) + 1.0,
        8 if half => 4.0 * t.powi(3),
        8 => 4.0 * (t - 1.0).powi(3) + 1.0,
        9 => 4.0 * (t - 0.5).powi(3) + 0.5,
        // Quart
        10 => t.powi(4),
        11 => -(t - 1.0).powi(4) + 1.0,
        12 if half => 8.0 * t.powi(4),
        12 => -8.0 * (t - 1.0).powi(4) + 1.0,
        13 if half => -8.0 * (t - 0.5).powi(4) + 0.5,
        13 => 8.0 * (t - 0.5).powi(4) + 0.5,
        // Quint
        14 => t.powi(5),
        15 => (t - 1.0).powi(5) + 1.0,
        16 if half => 16.0 * t.powi(5),
        16 => 16.0 * (t - 1.0).powi(5) + 1.0,
        17 => 16.0 * (t - 0.5).powi(5) + 0.5,
        // Sine
        18 => -(0.5 * PI * t).cos() + 1.0,
        19 => (0.5 * PI * t).sin(),
        20 => -0.5 * (PI * t).cos() + 0.5,
        21 if half => 0.5 * (PI * t).sin(),
        21 => -0.5 * (PI * t).sin() + 1.0,
        // Expo
        22 => (1.0 / 1023.0) * (2f64.powf(10.0 * t) - 1.0),
        23 => -(1024.0 / 1023.0) * (2f64.powf(-10.0 * t) - 1.0),
        24 if half => (1.0 / 62.0) * (2f64.powf(10.0 * t) - 1.0),
        24 => -(512.0 / 31.0) * 2f64.powf(-10.0 * t) + 63.0 / 62.0,
        25 if half => -(16.0 / 31.0) * (2f64.powf(-10.0 * t) - 1.0),
        25 => (1.0 / 1984.0) * 2f64.powf(10.0 * t) + 15.0 / 31.0,
        // Circ
        26 => 1.0 - (1.0 - t * t).sqrt(),
        27 => (1.0 - (t - 1.0).powi(2)).sqrt(),
        28 if half => 0.5 * (1.0 - (1.0 - 4.0 * t * t).sqrt()),
        28 => 0.5 * ((1.0 - 4.0 * (t - 1.0).powi(2)).sqrt() + 1.0),
        29 if half => 0.5 * (1.0 - (2.0 * t - 1.0).powi(2)).sqrt(),
        29 => 0.5 * (2.0 - (1.0 - (2.0 * t - 1.0).powi(2)).sqrt()),
        // Elastic
        30 => -a * 2f64.powf(10.0 * t - 10.0) * (2.0 * t * PI / period - phase).sin(),
        31 => a * 2f64.powf(-10.0 * t) * (2.0 * t * PI / period - phase).sin() + 1.0,
        32 if half => -0.5 * a * 2f64.powf(20.0 * t - 10.0) * (4.0 * t * PI / period - phase).sin(),
        32 => -0.5 * a * 2f64.powf(-20.0 * t + 10.0) * (4.0 * t * PI / period + phase).sin() + 1.0,
        33 if half => 0.5 * a * 2f64.powf(-20.0 * t) * (4.0 * t * PI / period - phase).sin() + 0.5,
        33 => -0.5 * a * 2f64.powf(20.0 * t - 20.0) * (4.0 * t * PI / period - phase).sin() + 0.5,
        // Back
        34 => (s + 1.0) * t.powi(3) - s * t.powi(2),
        35 => (s + 1.0) * (t - 1.0).powi(3) + s * (t - 1.0).powi(2) + 1.0,
        36 if half => 4.0 * (s + 1.0) * t.powi(3) - 2.0 * s * t.powi(2),
        36 => 0.5 * (s + 1.0) * (2.0 * t - 2.0).powi(3) + s / 2.0 * (2.0 * t - 2.0).powi(2) + 1.0,
        37 if half => 0.5 * ((s + 1.0) * (2.0 * t - 1.0).powi(3) + s * (2.0 * t - 1.0).powi(2) + 1.0),
        37 => 4.0 * (s + 1.0) * (t - 0.5).powi(3) - 2.0 * s * (t - 0.5).powi(2) + 0.5,
        // Bounce
        38 => in_bounce(t, a),
        39 => out_bounce(t, a),
        40 => in_out_bounce(t, a),
        41 => out_in_bounce(t, a),
        LINEAR => t,
        other => {
            log::warn!("Unsupported animation type: {other}");
            t
        }
    }
}

const K11: f64 = 121.0 / 16.0;
const K22: f64 = 121.0 / 8.0;

fn in_bounce(t: f64, a: f64) -> f64 {
    if t < 1.0 / 11.0 {
        -a * K11 * (t * t - t / 11.0)
    } else if t < 3.0 / 11.0 {
        -a * K11 * (t * t - (4.0 / 11.0) * t + 3.0 / 121.0)
    } else if t < 7.0 / 11.0 {
        -a * K11 * (t * t - (10.0 / 11.0) * t + 21.0 / 121.0)
    } else {
        -K11 * (t * t - 2.0 * t + 1.0) + 1.0
    }
}

fn out_bounce(t: f64, a: f64) -> f64 {
    if t < 4.0 / 11.0 {
        K11 * t * t
    } else if t < 8.0 / 11.0 {
        a * K11 * (t * t - (12.0 / 11.0) * t + 32.0 / 121.0) + 1.0
    } else if t < 10.0 / 11.0 {
        a * K11 * (t * t - (18.0 / 11.0) * t + 80.0 / 121.0) + 1.0
    } else {
        a * K11 * (t * t - (21.0 / 11.0) * t + 10.0 / 11.0) + 1.0
    }
}

fn in_out_bounce(t: f64, a: f64) -> f64 {
    let q = t * t;
    match t {
        t if t < 1.0 / 22.0 => -a * K22 * (q - t / 22.0),
        t if t < 3.0 / 22.0 => -a * K22 * (q - (2.0 / 11.0) * t + 3.0 / 484.0),
        t if t < 7.0 / 22.0 => -a * K22 * (q - (5.0 / 11.0) * t + 21.0 / 484.0),
        t if t < 11.0 / 22.0 => -K22 * (q - t + 0.25) + 0.5,
        t if t < 15.0 / 22.0 => K22 * (q - t) + 137.0 / 32.0,
        t if t < 19.0 / 22.0 => a * K22 * (q - (17.0 / 11.0) * t + 285.0 / 484.0) + 1.0,
        t if t < 21.0 / 22.0 => a * K22 * (q - (20.0 / 11.0) * t + 399.0 / 484.0) + 1.0,
        t => a * K22 * (q - (43.0 / 22.0) * t + 21.0 / 22.0) + 1.0,
    }
}

fn out_in_bounce(t: f64, a: f64) -> f64 {
    let q = t * t;
    match t {
        t if t < 4.0 / 22.0 => K22 * q,
        t if t < 8.0 / 22.0 => -a * K22 * (q - (6.0 / 11.0) * t + 8.0 / 121.0) + 0.5,
        t if t < 10.0 / 22.0 => -a * K22 * (q - (9.0 / 11.0) * t + 20.0 / 121.0) + 0.5,
        t if t < 11.0 / 22.0 => -a * K22 * (q - (21.0 / 22.0) * t + 5.0 / 22.0) + 0.5,
        t if t < 12.0 / 22.0 => a * K22 * (q - (23.0 / 22.0) * t + 3.0 / 11.0) + 0.5,
        t if t < 14.0 / 22.0 => a * K22 * (q - (13.0 / 11.0) * t + 42.0 / 121.0) + 0.5,
        t if t < 18.0 / 22.0 => a * K22 * (q - (16.0 / 11.0) * t + 63.0 / 121.0) + 0.5,
        _ => -K22 * (q - 2.0 * t + 117.0 / 121.0) + 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn codes_follow_name_order() {
        assert_eq!(code_of("Linear"), Some(1));
        assert_eq!(code_of("InQuad"), Some(2));
        assert_eq!(code_of("OutInBounce"), Some(41));
        assert_eq!(code_of("Wobble"), None);
    }

    #[test]
    fn polynomial_and_smooth_curves_hit_both_ends() {
        let p = EasingParams::default();
        for name in ["Linear", "InQuad", "OutCubic", "InOutQuart", "OutQuint", "InSine", "InOutSine", "InExpo", "OutExpo", "InCirc", "OutCirc", "InBack", "OutBack", "OutBounce"] {
            let code = code_of(name).unwrap();
            assert!(close(value_for_progress(code, 0.0, &p), 0.0), "{name} at 0");
            assert!(close(value_for_progress(code, 1.0, &p), 1.0), "{name} at 1");
        }
    }

    #[test]
    fn in_out_curves_pass_through_midpoint() {
        let p = EasingParams::default();
        for name in ["InOutQuad", "InOutCubic", "InOutSine", "OutInCubic"] {
            assert!(close(value_for_progress(code_of(name).unwrap(), 0.5, &p), 0.5), "{name}");
        }
    }

    #[test]
    fn unknown_code_is_linear() {
        assert!(close(value_for_progress(99, 0.25, &EasingParams::default()), 0.25));
    }
}
