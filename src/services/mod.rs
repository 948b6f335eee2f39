pub mod damage_accumulator;
pub mod device_validation;
pub mod device_yaml;
pub mod integrator;
pub mod lifetime_error;
pub mod lifetime_pipeline;
pub mod load_profile_yaml;
pub mod power_loss_model;
pub mod rainflow;
pub mod results_json;
pub mod results_types;
pub mod thermal_simulation;
pub mod trace_plot;
pub mod trace_query;
