pub mod combine;
pub mod damage;
pub mod source;

pub use combine::OverpressureCombination;
pub use damage::{DamageFunction, DamageStep, StepDamage};
pub use source::{
    load_sources, read_sources, Source, FEET_PER_METER, NEGLIGIBLE_EFFECT_DISTANCE_1KT_M,
};
