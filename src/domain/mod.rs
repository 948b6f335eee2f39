pub mod damage;
pub mod device;
pub mod load_profile;
pub mod power_loss;
pub mod thermal_cycle;
pub mod thermal_state;
