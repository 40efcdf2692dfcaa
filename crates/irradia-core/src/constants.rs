//! Single source of truth for shared constants.
//! Values that the GPU kernels also depend on are injected into the WGSL
//! preamble by `irradia-gpu`.

/// Border texels on each side of a probe's octahedral block.
pub const PROBE_BORDER_TEXELS: u32 = 1;

/// Default rays traced per probe per update cycle.
pub const DEFAULT_PROBE_NUM_RAYS: u32 = 144;

/// Default interior resolution of a probe's irradiance octahedral map.
pub const DEFAULT_IRRADIANCE_INTERIOR_TEXELS: u32 = 6;

/// Default interior resolution of a probe's distance octahedral map.
pub const DEFAULT_DISTANCE_INTERIOR_TEXELS: u32 = 14;

/// Default hysteresis. 0.97 keeps ~3% of each new cycle.
pub const DEFAULT_PROBE_HYSTERESIS: f32 = 0.97;

/// Default ray cutoff in world units.
pub const DEFAULT_PROBE_MAX_RAY_DISTANCE: f32 = 100.0;

/// Default surface bias along the shading normal.
pub const DEFAULT_PROBE_NORMAL_BIAS: f32 = 0.1;

/// Default surface bias towards the camera.
pub const DEFAULT_PROBE_VIEW_BIAS: f32 = 0.3;

/// Default perceptual encoding exponent for stored irradiance.
pub const DEFAULT_IRRADIANCE_ENCODING_GAMMA: f32 = 5.0;

/// Default exponent applied to the cosine weight when blending distances.
pub const DEFAULT_PROBE_DISTANCE_EXPONENT: f32 = 50.0;

/// Weight sums below this are treated as "no ray reached this texel".
pub const MIN_WEIGHT_SUM: f32 = 1e-6;

/// Lower bound of the Chebyshev visibility weight. Keeps fully occluded
/// probes from dropping out of the blend entirely.
pub const MIN_VISIBILITY_WEIGHT: f32 = 0.05;

/// Probe-to-point distances below this skip the directional tests.
pub const COINCIDENT_PROBE_DISTANCE: f32 = 1e-4;

/// Golden ratio minus one, used by the spherical Fibonacci sequence.
pub const GOLDEN_RATIO_FRACT: f32 = 0.618_034;
