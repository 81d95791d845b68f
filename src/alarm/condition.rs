use crate::Result;
use crate::TagValue;

/// Pure alarm predicate supplied externally per alarm.
///
/// Must be side-effect free; the engine may call it any number of times for
/// the same value. Parsing condition definitions is a configuration
/// concern, out of scope here.
pub trait AlarmCondition: Send + Sync {
    fn evaluate_state(
        &self,
        value: &TagValue,
    ) -> Result<bool>;
}

/// Active while the tag value equals the trigger value.
#[derive(Debug, Clone)]
pub struct ValueCondition {
    pub trigger: TagValue,
}

impl AlarmCondition for ValueCondition {
    fn evaluate_state(
        &self,
        value: &TagValue,
    ) -> Result<bool> {
        Ok(*value == self.trigger)
    }
}

/// Active while the numeric tag value lies inside `[min, max]`, or outside
/// it when `out_of_range_trigger` is set. Non-numeric values never trigger.
#[derive(Debug, Clone)]
pub struct RangeCondition {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub out_of_range_trigger: bool,
}

impl AlarmCondition for RangeCondition {
    fn evaluate_state(
        &self,
        value: &TagValue,
    ) -> Result<bool> {
        let v = match value.as_f64() {
            Some(v) => v,
            None => return Ok(false),
        };
        let in_range =
            self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max);
        Ok(in_range != self.out_of_range_trigger)
    }
}
