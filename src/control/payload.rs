//! Typed configuration payloads for write endpoints

use serde::Serialize;

use crate::config::SessionConfig;

/// Body of the power endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerCommand {
    pub state: u8,
}

/// Body of the acquisition endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcquisitionCommand {
    pub state: u8,
}

impl AcquisitionCommand {
    pub const START: Self = Self { state: 1 };
    pub const STOP: Self = Self { state: 0 };
}

/// Body of the setup endpoint: radar geometry plus trigger timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupCommand {
    pub gpr0: Parameters<GprParameters>,
    pub timer: Parameters<TimerParameters>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters<T> {
    pub parameters: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GprParameters {
    pub points_per_trace: u32,
    pub window_time_shift_ps: i64,
    pub point_stacks: u32,
    pub time_sampling_interval_ps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerParameters {
    pub period_s: f64,
}

impl From<&SessionConfig> for SetupCommand {
    fn from(config: &SessionConfig) -> Self {
        Self {
            gpr0: Parameters {
                parameters: GprParameters {
                    points_per_trace: config.points_per_trace,
                    window_time_shift_ps: config.window_time_shift_ps,
                    point_stacks: config.point_stacks,
                    time_sampling_interval_ps: config.time_sampling_interval_ps,
                },
            },
            timer: Parameters { parameters: TimerParameters { period_s: config.period_s } },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setup_payload_nests_parameters() {
        let config = SessionConfig {
            points_per_trace: 200,
            time_sampling_interval_ps: 100,
            point_stacks: 4,
            period_s: 0.2,
            window_time_shift_ps: -57_000,
        };

        let value = serde_json::to_value(SetupCommand::from(&config)).unwrap();
        assert_eq!(
            value,
            json!({
                "gpr0": {"parameters": {
                    "points_per_trace": 200,
                    "window_time_shift_ps": -57000,
                    "point_stacks": 4,
                    "time_sampling_interval_ps": 100
                }},
                "timer": {"parameters": {"period_s": 0.2}}
            })
        );
    }

    #[test]
    fn acquisition_states() {
        assert_eq!(serde_json::to_value(AcquisitionCommand::START).unwrap(), json!({"state": 1}));
        assert_eq!(serde_json::to_value(AcquisitionCommand::STOP).unwrap(), json!({"state": 0}));
    }
}
