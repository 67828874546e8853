//! Light field: источники света, shadow sampling, evaluator

pub mod evaluator;
pub mod shadow;
pub mod source;

pub use evaluator::{direct_contribution, LightFieldEvaluator, LightSample};
pub use shadow::{shadow_factor, ShadowJitter, ShadowSampling};
pub use source::{CachedLight, LightKind, LightSource, ReflectionProbe};
