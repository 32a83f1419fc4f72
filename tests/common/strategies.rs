use proptest::prelude::*;
use reliability_core::health::MetricType;

/// Strategy for breaker thresholds small enough to exercise quickly
pub fn threshold_strategy() -> impl Strategy<Value = u32> {
    1u32..20
}

/// Strategy for a sequence of call outcomes; `true` is success
pub fn outcome_sequence_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..64)
}

/// Strategy for injection probabilities, edges included
pub fn probability_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(1.0), 0.0f64..=1.0]
}

pub fn metric_type_strategy() -> impl Strategy<Value = MetricType> {
    prop::sample::select(MetricType::ALL.to_vec())
}

/// Strategy for configuration paths like `render.quality`
pub fn config_path_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}"
}
